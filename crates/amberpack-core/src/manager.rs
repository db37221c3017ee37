//! Long-lived resource registry: mounts packages, resolves names to IDs,
//! loads payloads on demand, reference-counts them, and supports reload.
//!
//! All registry state lives behind a single mutex; every public operation
//! takes it for the entire call, including any file I/O, so operations are
//! linearizable but a slow disk read blocks concurrent callers. Public
//! entry points lock once and delegate to `*_locked` helpers that operate
//! on the already-locked state and never re-acquire. Hot-reload sinks are
//! always invoked with the state lock released.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::compression;
use crate::error::{PackageError, Result};
use crate::hash;
use crate::io::PackageFile;
use crate::metadata::{AssetId, ResourceMetadata, ResourceType, INVALID_ASSET_ID};

/// Per-resource load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
    Unloading,
}

/// Notification sink invoked with the asset ID of every successful reload.
pub type HotReloadSink = Arc<dyn Fn(AssetId) + Send + Sync>;

struct ResourceItem {
    metadata: ResourceMetadata,
    payload: Option<Arc<Vec<u8>>>,
    status: LoadStatus,
    ref_count: u32,
    dependencies: Vec<AssetId>,
}

impl ResourceItem {
    fn new(metadata: ResourceMetadata) -> Self {
        ResourceItem {
            metadata,
            payload: None,
            status: LoadStatus::Unloaded,
            ref_count: 0,
            dependencies: Vec::new(),
        }
    }
}

#[derive(Default)]
struct ManagerState {
    initialized: bool,
    root_path: PathBuf,
    name_to_id: HashMap<String, AssetId>,
    resources: HashMap<AssetId, ResourceItem>,
    package_to_ids: HashMap<PathBuf, Vec<AssetId>>,
    total_memory: usize,
}

/// The resource registry and lifecycle engine.
///
/// An explicit context value: construct one with [`new`], call
/// [`initialize`] before use and [`shutdown`] when done. Callers that want
/// a process-wide instance wrap one themselves.
///
/// [`new`]: ResourceManager::new
/// [`initialize`]: ResourceManager::initialize
/// [`shutdown`]: ResourceManager::shutdown
pub struct ResourceManager {
    state: Mutex<ManagerState>,
    hot_reload_sinks: Mutex<Vec<HotReloadSink>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        ResourceManager {
            state: Mutex::new(ManagerState::default()),
            hot_reload_sinks: Mutex::new(Vec::new()),
        }
    }

    /// Initialize with the resource root directory.
    ///
    /// Idempotent: initializing an already-initialized manager is a no-op
    /// returning success.
    pub fn initialize<P: AsRef<Path>>(&self, root_path: P) -> Result<()> {
        let mut state = self.state.lock();
        if state.initialized {
            return Ok(());
        }

        let root = root_path.as_ref();
        if !root.is_dir() {
            return Err(PackageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Resource root does not exist: {}", root.display()),
            )));
        }

        state.root_path = root.to_path_buf();
        state.initialized = true;
        info!("Resource manager initialized, root: {}", root.display());
        Ok(())
    }

    /// Release everything and return to the uninitialized state.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if !state.initialized {
                return;
            }

            Self::unload_all_locked(&mut state);
            state.name_to_id.clear();
            state.resources.clear();
            state.package_to_ids.clear();
            state.total_memory = 0;
            state.initialized = false;
        }

        self.hot_reload_sinks.lock().clear();
        info!("Resource manager shut down");
    }

    /// Mount a package: validate the header and checksum, ingest the
    /// metadata table. Payload bytes are not retained.
    pub fn mount<P: AsRef<Path>>(&self, package_path: P) -> Result<()> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(PackageError::NotInitialized);
        }

        let path = package_path.as_ref();
        if state.package_to_ids.contains_key(path) {
            return Err(PackageError::Duplicate(path.display().to_string()));
        }

        let mut package = PackageFile::open(path)?;
        package.verify_checksum()?;
        let table = package.read_metadata_table()?;

        info!(
            "Mounting package {} (version {}, {} resources)",
            path.display(),
            package.header().version,
            table.len()
        );

        let mut ids = Vec::with_capacity(table.len());
        for mut meta in table {
            // The on-disk id is advisory; derive the real one from the name.
            let id = hash::fnv1a_32(meta.name.as_bytes());
            meta.id = id;

            if state.resources.contains_key(&id) {
                warn!("Resource '{}' already registered, skipping", meta.name);
                continue;
            }

            debug!("Registered resource '{}' -> {:#010x}", meta.name, id);
            state.name_to_id.insert(meta.name.clone(), id);
            state.resources.insert(id, ResourceItem::new(meta));
            ids.push(id);
        }

        state.package_to_ids.insert(path.to_path_buf(), ids);
        Ok(())
    }

    /// Unmount a package, removing its contribution.
    ///
    /// Entries with outstanding references survive as metadata-only records
    /// (status `Unloaded`) so handles held by callers stay queryable;
    /// unreferenced entries are removed entirely.
    pub fn unmount<P: AsRef<Path>>(&self, package_path: P) -> Result<()> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(PackageError::NotInitialized);
        }
        Self::unmount_locked(&mut state, package_path.as_ref())
    }

    /// Unmount every mounted package.
    pub fn unmount_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(PackageError::NotInitialized);
        }

        let paths: Vec<PathBuf> = state.package_to_ids.keys().cloned().collect();
        for path in paths {
            Self::unmount_locked(&mut state, &path)?;
        }
        Ok(())
    }

    /// Resolve `name`, load its payload if necessary, and take a reference.
    ///
    /// Returns the asset ID, or [`INVALID_ASSET_ID`] on any failure (the
    /// cause is logged and the item, if any, is marked `Failed`).
    pub fn load(&self, name: &str, resource_type: ResourceType) -> AssetId {
        let mut state = self.state.lock();
        match Self::load_locked(&mut state, name, resource_type) {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to load '{}': {}", name, e);
                INVALID_ASSET_ID
            }
        }
    }

    /// [`load`], then invoke `callback` exactly once with the terminal
    /// status. The callback runs on the caller's thread with the registry
    /// lock released.
    ///
    /// [`load`]: ResourceManager::load
    pub fn load_async<F>(&self, name: &str, resource_type: ResourceType, callback: F) -> AssetId
    where
        F: FnOnce(AssetId, LoadStatus),
    {
        let id = self.load(name, resource_type);
        let status = if id != INVALID_ASSET_ID {
            LoadStatus::Loaded
        } else {
            LoadStatus::Failed
        };
        callback(id, status);
        id
    }

    /// Get the decompressed payload of a loaded resource.
    ///
    /// The returned handle stays valid even across `release`/`reload`/
    /// `unmount`; the registry's memory accounting only tracks payloads it
    /// still holds.
    pub fn get(&self, id: AssetId) -> Option<Arc<Vec<u8>>> {
        let state = self.state.lock();
        state
            .resources
            .get(&id)
            .filter(|item| item.status == LoadStatus::Loaded)
            .and_then(|item| item.payload.clone())
    }

    /// Whether the resource is resident in memory.
    pub fn is_loaded(&self, id: AssetId) -> bool {
        let state = self.state.lock();
        state
            .resources
            .get(&id)
            .map(|item| item.status == LoadStatus::Loaded)
            .unwrap_or(false)
    }

    /// Take an additional reference on an existing resource. No-op if the
    /// id is unknown.
    pub fn add_ref(&self, id: AssetId) {
        let mut state = self.state.lock();
        if let Some(item) = state.resources.get_mut(&id) {
            item.ref_count += 1;
        }
    }

    /// Drop one reference. When the count reaches zero the payload is freed
    /// and the resource returns to `Unloaded`; its metadata is retained so
    /// it can be loaded again.
    pub fn release(&self, id: AssetId) {
        let mut state = self.state.lock();
        let state = &mut *state;
        if let Some(item) = state.resources.get_mut(&id) {
            if item.ref_count == 0 {
                return;
            }
            item.ref_count -= 1;
            if item.ref_count == 0 && item.status == LoadStatus::Loaded {
                Self::free_payload(item, &mut state.total_memory);
                item.status = LoadStatus::Unloaded;
            }
        }
    }

    /// Re-read a resource's payload from its owning package, preserving the
    /// reference count, then notify hot-reload subscribers.
    ///
    /// On failure the resource is left `Unloaded` with its original
    /// reference count and no subscriber is invoked.
    pub fn reload(&self, id: AssetId) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !state.initialized {
                return Err(PackageError::NotInitialized);
            }
            Self::reload_locked(&mut state, id)?;
        }

        // Fire subscribers with the state lock released so a sink may call
        // back into the manager.
        let sinks: Vec<HotReloadSink> = self.hot_reload_sinks.lock().clone();
        for sink in sinks {
            sink(id);
        }
        Ok(())
    }

    /// Register a sink invoked with the asset ID on every successful
    /// reload.
    pub fn register_hot_reload<F>(&self, sink: F)
    where
        F: Fn(AssetId) + Send + Sync + 'static,
    {
        self.hot_reload_sinks.lock().push(Arc::new(sink));
    }

    /// Metadata of a registered resource.
    pub fn resource_info(&self, id: AssetId) -> Option<ResourceMetadata> {
        let state = self.state.lock();
        state.resources.get(&id).map(|item| item.metadata.clone())
    }

    /// Logical name of a registered resource.
    pub fn resource_name(&self, id: AssetId) -> Option<String> {
        let state = self.state.lock();
        state.resources.get(&id).map(|item| item.metadata.name.clone())
    }

    /// Type of a registered resource.
    pub fn resource_type(&self, id: AssetId) -> Option<ResourceType> {
        let state = self.state.lock();
        state.resources.get(&id).map(|item| item.metadata.resource_type)
    }

    /// Declared dependencies of a registered resource.
    pub fn resource_dependencies(&self, id: AssetId) -> Option<Vec<AssetId>> {
        let state = self.state.lock();
        state.resources.get(&id).map(|item| item.dependencies.clone())
    }

    /// Number of resources currently resident in memory.
    pub fn loaded_count(&self) -> usize {
        let state = self.state.lock();
        state
            .resources
            .values()
            .filter(|item| item.status == LoadStatus::Loaded)
            .count()
    }

    /// Sum of resident payload bytes.
    pub fn total_memory(&self) -> usize {
        self.state.lock().total_memory
    }

    /// The resource root directory, once initialized.
    pub fn root_path(&self) -> Option<PathBuf> {
        let state = self.state.lock();
        state.initialized.then(|| state.root_path.clone())
    }

    /// Free every resident payload with a reference count of zero.
    pub fn unload_unused(&self) {
        let mut state = self.state.lock();
        let state = &mut *state;
        for item in state.resources.values_mut() {
            if item.ref_count == 0 && item.status == LoadStatus::Loaded {
                Self::free_payload(item, &mut state.total_memory);
                item.status = LoadStatus::Unloaded;
            }
        }
    }

    /// Free every resident payload regardless of reference counts.
    /// Reference counts themselves are preserved; a later `load` resumes
    /// counting from the current value.
    pub fn unload_all(&self) {
        let mut state = self.state.lock();
        Self::unload_all_locked(&mut state);
    }

    /// Write a generated source file of asset-ID constants for every
    /// registered resource name.
    pub fn export_asset_ids<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let pairs: Vec<(String, AssetId)> = {
            let state = self.state.lock();
            if !state.initialized {
                return Err(PackageError::NotInitialized);
            }
            state
                .name_to_id
                .iter()
                .map(|(name, &id)| (name.clone(), id))
                .collect()
        };

        crate::codegen::write_asset_ids(path, &pairs)
    }

    // ---- private helpers; the state lock is already held ----

    fn load_locked(
        state: &mut ManagerState,
        name: &str,
        resource_type: ResourceType,
    ) -> Result<AssetId> {
        if !state.initialized {
            return Err(PackageError::NotInitialized);
        }

        let id = *state
            .name_to_id
            .get(name)
            .ok_or_else(|| PackageError::NameNotFound(name.to_string()))?;

        let item = state
            .resources
            .get_mut(&id)
            .ok_or_else(|| PackageError::NameNotFound(name.to_string()))?;

        if item.metadata.resource_type != resource_type {
            return Err(PackageError::TypeMismatch {
                name: name.to_string(),
                stored: item.metadata.resource_type,
                requested: resource_type,
            });
        }

        if item.status == LoadStatus::Loaded {
            item.ref_count += 1;
            return Ok(id);
        }

        item.status = LoadStatus::Loading;
        let metadata = item.metadata.clone();

        let package_path = match Self::owning_package(state, id) {
            Some(path) => path,
            None => {
                // Typically an unmounted package with this handle still
                // outstanding; only a new mount can re-bind the name.
                let item = state.resources.get_mut(&id).unwrap();
                item.status = LoadStatus::Failed;
                return Err(PackageError::NameNotFound(name.to_string()));
            }
        };

        match Self::read_payload_from(&package_path, &metadata) {
            Ok(payload) => {
                let item = state.resources.get_mut(&id).unwrap();
                state.total_memory += payload.len();
                item.payload = Some(Arc::new(payload));
                item.status = LoadStatus::Loaded;
                item.ref_count += 1;
                Ok(id)
            }
            Err(e) => {
                let item = state.resources.get_mut(&id).unwrap();
                item.status = LoadStatus::Failed;
                Err(e)
            }
        }
    }

    fn reload_locked(state: &mut ManagerState, id: AssetId) -> Result<()> {
        let item = state
            .resources
            .get_mut(&id)
            .ok_or_else(|| PackageError::NameNotFound(format!("asset id {:#010x}", id)))?;

        // Drop the stale payload first; the reference count is untouched
        // throughout.
        Self::free_payload(item, &mut state.total_memory);
        item.status = LoadStatus::Unloaded;
        let metadata = item.metadata.clone();
        let name = metadata.name.clone();

        let package_path = Self::owning_package(state, id)
            .ok_or_else(|| PackageError::NameNotFound(name.clone()))?;

        let payload = Self::read_payload_from(&package_path, &metadata)?;

        let item = state.resources.get_mut(&id).unwrap();
        state.total_memory += payload.len();
        item.payload = Some(Arc::new(payload));
        item.status = LoadStatus::Loaded;
        info!("Reloaded resource '{}' ({:#010x})", name, id);
        Ok(())
    }

    fn unmount_locked(state: &mut ManagerState, path: &Path) -> Result<()> {
        let ids = state
            .package_to_ids
            .remove(path)
            .ok_or_else(|| PackageError::NameNotFound(path.display().to_string()))?;

        info!("Unmounting package {} ({} resources)", path.display(), ids.len());

        for id in ids {
            let Some(item) = state.resources.get_mut(&id) else {
                continue;
            };

            if item.ref_count > 0 {
                // Handles are still outstanding; keep the record queryable
                // but free the payload.
                Self::free_payload(item, &mut state.total_memory);
                item.status = LoadStatus::Unloaded;
            } else {
                Self::free_payload(item, &mut state.total_memory);
                let name = item.metadata.name.clone();
                state.resources.remove(&id);
                state.name_to_id.remove(&name);
            }
        }

        Ok(())
    }

    fn unload_all_locked(state: &mut ManagerState) {
        for item in state.resources.values_mut() {
            item.payload = None;
            if item.status == LoadStatus::Loaded {
                item.status = LoadStatus::Unloaded;
            }
        }
        state.total_memory = 0;
    }

    /// Locate the package that contributed `id`.
    fn owning_package(state: &ManagerState, id: AssetId) -> Option<PathBuf> {
        state
            .package_to_ids
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(path, _)| path.clone())
    }

    /// Read and decompress one payload from a package on disk.
    fn read_payload_from(package_path: &Path, metadata: &ResourceMetadata) -> Result<Vec<u8>> {
        let mut package = PackageFile::open(package_path)?;
        let stored = package.read_payload(metadata)?;
        compression::decompress(
            &stored,
            metadata.compression,
            metadata.original_size as usize,
        )
    }

    fn free_payload(item: &mut ResourceItem, total_memory: &mut usize) {
        if let Some(payload) = item.payload.take() {
            *total_memory = total_memory.saturating_sub(payload.len());
        }
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}
