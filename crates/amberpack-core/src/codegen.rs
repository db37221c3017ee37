//! Generated asset-ID constants artifact.
//!
//! After packing, tooling can emit a source file mapping symbolic resource
//! names to their stable IDs so game code can refer to assets without
//! string lookups. The artifact is external to the package format; nothing
//! in the core reads it back.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{PackageError, Result};
use crate::metadata::AssetId;

/// Render asset-ID constants as Rust source.
///
/// Output is sorted by name so regeneration is deterministic. Two names
/// that sanitize to the same constant identifier are rejected with
/// `Duplicate`.
pub fn render_asset_ids(pairs: &[(String, AssetId)]) -> Result<String> {
    let mut sorted: Vec<&(String, AssetId)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut seen = HashSet::new();
    let mut out = String::new();
    out.push_str("// Generated asset-ID constants. Do not edit.\n\n");

    for (name, id) in sorted {
        let ident = sanitize_identifier(name);
        if !seen.insert(ident.clone()) {
            return Err(PackageError::Duplicate(format!(
                "Constant name collision: {} (from '{}')",
                ident, name
            )));
        }
        // Writing into a String cannot fail.
        writeln!(out, "pub const {}: u32 = {:#010x};", ident, id).unwrap();
    }

    Ok(out)
}

/// Render and write the constants file to `path`.
pub fn write_asset_ids<P: AsRef<Path>>(path: P, pairs: &[(String, AssetId)]) -> Result<()> {
    let contents = render_asset_ids(pairs)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Map a logical resource name to an `ID_`-prefixed upper-snake constant
/// identifier.
fn sanitize_identifier(name: &str) -> String {
    let mut ident = String::with_capacity(name.len() + 3);
    ident.push_str("ID_");
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            ident.push(c.to_ascii_uppercase());
        } else {
            ident.push('_');
        }
    }
    ident
}
