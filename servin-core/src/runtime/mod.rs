//! External Facade (§4): the single entry point `servin-cli` (and any
//! other embedder) calls through. [`ServinRuntime`] wires together every
//! resource manager behind [`servin_shared::layout::ServinLayout`] and
//! presents the same API whether the host ends up running containers
//! natively or relaying them into a guest VM (§4.2).

use std::path::PathBuf;
use std::sync::Arc;

use servin_shared::constants::envs;
use servin_shared::layout::ServinLayout;
use servin_shared::{ContainerId, PortMapping, ServinResult};

use crate::images::ImageStore;
use crate::lifecycle::{CreateSpec, LifecycleEngine, LogLine};
use crate::net::NetworkManager;
use crate::orchestrator::VmOrchestrator;
use crate::platform;
use crate::store::{ContainerRecord, FileLock, StateStore, VolumeBinding};
use crate::vmm::{GuestExecOutput, ProviderKind};
use crate::volumes::VolumeManager;

/// How to locate the runtime's on-disk base directory (§6): an
/// explicit override, else `SERVIN_BASE_DIR`, else `~/.servin`, else
/// `/tmp/servin`.
pub struct ServinOptions {
    pub base_dir: Option<PathBuf>,
    /// Force a specific VM backend instead of autodetecting (§4.6);
    /// mainly useful for tests and the `Development` backend.
    pub vm_provider: Option<ProviderKind>,
}

impl Default for ServinOptions {
    fn default() -> Self {
        Self { base_dir: None, vm_provider: None }
    }
}

impl ServinOptions {
    fn resolve_base_dir(&self) -> PathBuf {
        if let Some(dir) = &self.base_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(envs::SERVIN_BASE_DIR) {
            return PathBuf::from(dir);
        }
        if let Some(home) = dirs::home_dir() {
            return home.join(".servin");
        }
        PathBuf::from("/tmp/servin")
    }
}

/// The runtime facade. Holds the whole-runtime advisory lock for its
/// lifetime (§4.3, §9) — only one `ServinRuntime` may be open against a
/// given base directory at a time.
pub struct ServinRuntime {
    layout: ServinLayout,
    _lock: FileLock,
    store: Arc<StateStore>,
    images: ImageStore,
    volumes: VolumeManager,
    networks: NetworkManager,
    lifecycle: LifecycleEngine,
}

impl ServinRuntime {
    pub fn open(options: ServinOptions) -> ServinResult<Self> {
        let base_dir = options.resolve_base_dir();
        std::fs::create_dir_all(&base_dir)?;
        let layout = ServinLayout::new(base_dir);

        let lock = FileLock::acquire(&layout.lock_file())?;

        let store = Arc::new(StateStore::open(layout.base().to_path_buf())?);
        let images = ImageStore::open(layout.images_dir())?;
        let volumes = VolumeManager::new(layout.clone());
        let networks = NetworkManager::new(layout.clone())?;

        let vm = if platform::native_containers_supported() {
            None
        } else {
            let orchestrator = match options.vm_provider {
                Some(kind) => VmOrchestrator::with_provider(layout.clone(), kind)?,
                None => VmOrchestrator::autodetect(layout.clone())?,
            };
            Some(Arc::new(orchestrator))
        };

        let lifecycle = LifecycleEngine::new(store.clone(), images.clone(), layout.clone(), vm);

        Ok(Self { layout, _lock: lock, store, images, volumes, networks, lifecycle })
    }

    pub fn layout(&self) -> &ServinLayout {
        &self.layout
    }

    // --- containers (§4.5) ---

    pub fn create(&self, spec: CreateSpec) -> ServinResult<ContainerId> {
        self.lifecycle.create(spec)
    }

    pub fn start(&self, reference: &str) -> ServinResult<ContainerId> {
        self.lifecycle.start(reference)
    }

    pub fn stop(&self, reference: &str) -> ServinResult<()> {
        self.lifecycle.stop(reference)
    }

    pub fn remove(&self, reference: &str, force: bool) -> ServinResult<()> {
        self.lifecycle.remove(reference, force)
    }

    pub fn exec(&self, reference: &str, argv: &[String]) -> ServinResult<GuestExecOutput> {
        self.lifecycle.exec(reference, argv)
    }

    pub fn logs(
        &self,
        reference: &str,
        tail: Option<usize>,
        since: Option<chrono::DateTime<chrono::Utc>>,
        until: Option<chrono::DateTime<chrono::Utc>>,
    ) -> ServinResult<Vec<LogLine>> {
        self.lifecycle.logs(reference, tail, since, until)
    }

    pub fn get(&self, reference: &str) -> ServinResult<ContainerRecord> {
        self.store.get(reference)
    }

    pub fn list(&self) -> Vec<ContainerRecord> {
        self.store.list()
    }

    // --- images (§4.4) ---

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn build_image(
        &self,
        source: &str,
        context_dir: &std::path::Path,
        build_args: &std::collections::HashMap<String, String>,
        tag: Option<&str>,
    ) -> ServinResult<crate::images::ImageRecord> {
        crate::buildfile::build(&self.images, source, context_dir, build_args, tag)
    }

    pub fn import_image(
        &self,
        tar_path: &std::path::Path,
        name: Option<&str>,
        tag: Option<&str>,
    ) -> ServinResult<crate::images::ImageRecord> {
        self.images.import_tarball(tar_path, name, tag)
    }

    pub fn remove_image(&self, reference: &str, force: bool) -> ServinResult<()> {
        let store = &self.store;
        let images = &self.images;
        self.images.remove(reference, force, |id| {
            store
                .list()
                .iter()
                .any(|c| images.resolve(&c.image).map(|resolved| &resolved == id).unwrap_or(false))
        })
    }

    // --- volumes (§4.9) ---

    pub fn volumes(&self) -> &VolumeManager {
        &self.volumes
    }

    pub fn volume_in_use(&self, name: &str) -> bool {
        self.store
            .list()
            .iter()
            .any(|c| c.status != crate::store::ContainerStatus::Removed && c.volumes.iter().any(|v| v.source == name))
    }

    /// `remove(name, force)`: refuses if any non-removed container binds
    /// the volume, unless `force` (§3 VolumeRecord invariant, §4.9).
    pub fn remove_volume(&self, name: &str, force: bool) -> ServinResult<()> {
        if !force && self.volume_in_use(name) {
            return Err(servin_shared::ServinError::InvalidState(format!(
                "volume {name} is in use by a container; use force to remove anyway"
            )));
        }
        self.volumes.remove(name, force)
    }

    /// Remove every volume referenced by zero non-removed containers (§4.9 `prune`).
    pub fn prune_volumes(&self) -> ServinResult<Vec<String>> {
        let in_use: std::collections::HashSet<String> = self
            .store
            .list()
            .iter()
            .filter(|c| c.status != crate::store::ContainerStatus::Removed)
            .flat_map(|c| c.volumes.iter().map(|v| v.source.clone()))
            .collect();
        self.volumes.prune(&in_use)
    }

    pub fn resolve_volume_binding(&self, source: &str, target: &str, read_only: bool) -> VolumeBinding {
        VolumeBinding { source: source.to_string(), target: target.to_string(), read_only }
    }

    // --- networks (§4.9) ---

    pub fn networks(&self) -> &NetworkManager {
        &self.networks
    }

    pub fn publish_port(&self, network: &str, mapping: &PortMapping, container_ip: &str) -> ServinResult<()> {
        self.networks.publish(network, mapping.host_port, container_ip, mapping.container_port)
    }
}
