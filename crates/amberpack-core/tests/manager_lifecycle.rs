//! Manager lifecycle scenarios: reference counting, reload with live
//! handles, unmount semantics, and corruption rejection.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use amberpack_core::{
    hash, AssetPacker, PackageError, ResourceManager, ResourceType, INVALID_ASSET_ID,
};
use tempfile::TempDir;

fn pack_one(dir: &TempDir, file_name: &str, contents: &[u8], out_name: &str) -> PathBuf {
    let src = dir.path().join(file_name);
    fs::write(&src, contents).unwrap();

    let out = dir.path().join(out_name);
    let mut packer = AssetPacker::new();
    packer.set_output_path(&out);
    packer.set_overwrite(true);
    packer.add_resource(&src, ResourceType::Unknown).unwrap();
    packer.pack().unwrap();
    out
}

fn manager_for(dir: &TempDir) -> ResourceManager {
    let manager = ResourceManager::new();
    manager.initialize(dir.path()).unwrap();
    manager
}

#[test]
fn mount_load_get_release() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);

    manager.mount(&pkg).unwrap();

    let id = manager.load("hello", ResourceType::Script);
    assert_eq!(id, hash::fnv1a_32(b"hello"));
    assert_eq!(id, 0x4F9F2CAB);

    let payload = manager.get(id).unwrap();
    assert_eq!(payload.as_slice(), &[0x48, 0x65, 0x6C, 0x6C, 0x6F]);
    assert_eq!(manager.total_memory(), 5);
    assert_eq!(manager.loaded_count(), 1);

    manager.release(id);
    assert!(!manager.is_loaded(id));
    assert_eq!(manager.total_memory(), 0);
}

#[test]
fn type_mismatch_leaves_state_untouched() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg).unwrap();

    assert_eq!(
        manager.load("hello", ResourceType::Texture2d),
        INVALID_ASSET_ID
    );
    assert_eq!(manager.total_memory(), 0);
    assert_eq!(manager.loaded_count(), 0);

    // The correct type still loads afterwards.
    assert_ne!(
        manager.load("hello", ResourceType::Script),
        INVALID_ASSET_ID
    );
}

#[test]
fn reload_preserves_refcount_and_notifies_once() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg).unwrap();

    let id = manager.load("hello", ResourceType::Script);
    let id2 = manager.load("hello", ResourceType::Script);
    assert_eq!(id, id2);

    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    manager.register_hot_reload(move |reloaded| {
        assert_eq!(reloaded, 0x4F9F2CAB);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    // Rewrite the package on disk with a same-length payload; the mounted
    // metadata (offset and size) stays valid.
    pack_one(&dir, "hello.script", b"World", "hello.pkg");

    manager.reload(id).unwrap();
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(manager.get(id).unwrap().as_slice(), b"World");

    // The reference count survived the reload: two releases are needed.
    manager.release(id);
    assert!(manager.is_loaded(id));
    manager.release(id);
    assert!(!manager.is_loaded(id));
}

#[test]
fn handle_held_across_reload_stays_valid() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg).unwrap();

    let id = manager.load("hello", ResourceType::Script);
    let before = manager.get(id).unwrap();

    pack_one(&dir, "hello.script", b"World", "hello.pkg");
    manager.reload(id).unwrap();

    // The old handle still reads the old bytes; a fresh get sees the new.
    assert_eq!(before.as_slice(), b"Hello");
    assert_eq!(manager.get(id).unwrap().as_slice(), b"World");
}

#[test]
fn unmount_with_outstanding_refs_keeps_metadata() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg).unwrap();

    let id = manager.load("hello", ResourceType::Script);
    manager.unmount(&pkg).unwrap();

    // Metadata queries on the live handle still work.
    assert_eq!(manager.resource_name(id).as_deref(), Some("hello"));
    assert_eq!(manager.resource_type(id), Some(ResourceType::Script));
    assert!(manager.resource_info(id).is_some());

    // But the payload is gone and new loads fail: mounts are the only
    // source of name bindings to packages.
    assert!(manager.get(id).is_none());
    assert_eq!(manager.total_memory(), 0);
    assert_eq!(
        manager.load("hello", ResourceType::Script),
        INVALID_ASSET_ID
    );
}

#[test]
fn unmount_all_clears_every_package() {
    let dir = TempDir::new().unwrap();
    let pkg_a = pack_one(&dir, "alpha.script", b"aaaa", "a.pkg");
    let pkg_b = pack_one(&dir, "beta.script", b"bbbb", "b.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg_a).unwrap();
    manager.mount(&pkg_b).unwrap();

    manager.load("alpha", ResourceType::Script);
    manager.unmount_all().unwrap();

    assert_eq!(manager.total_memory(), 0);
    assert_eq!(
        manager.load("beta", ResourceType::Script),
        INVALID_ASSET_ID
    );
}

#[test]
fn refcount_conservation_over_mixed_sequence() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg).unwrap();

    let id = manager.load("hello", ResourceType::Script);
    manager.add_ref(id);
    manager.add_ref(id);
    // refs = 3; the payload stays resident until the last release.
    for _ in 0..2 {
        manager.release(id);
        assert!(manager.is_loaded(id));
        assert_eq!(manager.total_memory(), 5);
    }
    manager.release(id);
    assert!(!manager.is_loaded(id));
    assert_eq!(manager.total_memory(), 0);
}

#[test]
fn memory_accounting_tracks_loaded_set() {
    let dir = TempDir::new().unwrap();
    let pkg_a = pack_one(&dir, "alpha.script", b"aaaa", "a.pkg");
    let pkg_b = pack_one(&dir, "beta.script", b"bbbbbb", "b.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg_a).unwrap();
    manager.mount(&pkg_b).unwrap();

    let a = manager.load("alpha", ResourceType::Script);
    assert_eq!(manager.total_memory(), 4);
    let _b = manager.load("beta", ResourceType::Script);
    assert_eq!(manager.total_memory(), 10);
    assert_eq!(manager.loaded_count(), 2);

    manager.release(a);
    assert_eq!(manager.total_memory(), 6);

    manager.unload_all();
    assert_eq!(manager.total_memory(), 0);
    assert_eq!(manager.loaded_count(), 0);
}

#[test]
fn corrupted_package_fails_mount() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");

    // Flip a byte in the payload region.
    let mut bytes = fs::read(&pkg).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&pkg, &bytes).unwrap();

    let manager = manager_for(&dir);
    assert!(matches!(
        manager.mount(&pkg),
        Err(PackageError::ChecksumMismatch)
    ));

    // Nothing was registered.
    assert_eq!(
        manager.load("hello", ResourceType::Script),
        INVALID_ASSET_ID
    );
}

#[test]
fn garbage_file_fails_mount_with_bad_magic() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("bogus.pkg");
    fs::write(&bogus, vec![0x5A; 256]).unwrap();

    let manager = manager_for(&dir);
    assert!(matches!(
        manager.mount(&bogus),
        Err(PackageError::BadMagic)
    ));
}

#[test]
fn failed_load_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let pkg = pack_one(&dir, "hello.script", b"Hello", "hello.pkg");
    let manager = manager_for(&dir);
    manager.mount(&pkg).unwrap();

    // Truncate the payload region behind the manager's back; the next load
    // fails mid-read and marks the item Failed.
    let bytes = fs::read(&pkg).unwrap();
    fs::write(&pkg, &bytes[..bytes.len() - 2]).unwrap();
    assert_eq!(
        manager.load("hello", ResourceType::Script),
        INVALID_ASSET_ID
    );
    assert_eq!(manager.total_memory(), 0);

    // Restore the file; a retry succeeds.
    fs::write(&pkg, &bytes).unwrap();
    assert_ne!(
        manager.load("hello", ResourceType::Script),
        INVALID_ASSET_ID
    );
}
