//! VM Orchestrator (§4.7): provisions guest-VM artifacts, boots and
//! shuts down guest VMs through a [`crate::vmm::VmProvider`], and
//! bounds one boot in flight per VM with a per-VM mutex (§8 property 5
//! / scenario S6 idempotence).

mod artifacts;
mod cloud_init;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use servin_shared::constants::vm as vm_consts;
use servin_shared::layout::ServinLayout;
use servin_shared::{ServinError, ServinResult};

use crate::vmm::{self, GuestExecOutput, ProviderKind, VmConfig, VmProvider};

/// Next free SSH port in `SSH_PORT_RANGE`, tracked in-process; good
/// enough for one orchestrator per host process (§4.7).
struct PortAllocator {
    next: u16,
}

impl PortAllocator {
    fn new() -> Self {
        Self { next: *vm_consts::SSH_PORT_RANGE.start() }
    }

    fn allocate(&mut self) -> ServinResult<u16> {
        if self.next > *vm_consts::SSH_PORT_RANGE.end() {
            return Err(ServinError::ProviderUnavailable(
                "no free SSH forwarding ports left in the configured range".into(),
            ));
        }
        let port = self.next;
        self.next += 1;
        Ok(port)
    }
}

pub struct VmOrchestrator {
    layout: ServinLayout,
    provider: Arc<dyn VmProvider>,
    vm_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ports: Mutex<PortAllocator>,
}

impl VmOrchestrator {
    /// Pick the highest-priority provider this host can actually run
    /// (§4.6), falling back to `Development` when nothing else is
    /// available (always true in CI).
    pub fn autodetect(layout: ServinLayout) -> ServinResult<Self> {
        let kind = vmm::detect_available_providers()
            .into_iter()
            .next()
            .ok_or_else(|| ServinError::ProviderUnavailable("no VM provider is available on this host".into()))?;
        Self::with_provider(layout, kind)
    }

    pub fn with_provider(layout: ServinLayout, kind: ProviderKind) -> ServinResult<Self> {
        let provider = vmm::create_provider(kind)?;
        Ok(Self { layout, provider, vm_locks: Mutex::new(HashMap::new()), ports: Mutex::new(PortAllocator::new()) })
    }

    fn lock_for(&self, vm_id: &str) -> Arc<Mutex<()>> {
        self.vm_locks.lock().unwrap().entry(vm_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn vm_config(&self, vm_id: &str, ssh_port: u16) -> VmConfig {
        VmConfig {
            vm_id: vm_id.to_string(),
            cpus: vm_consts::DEFAULT_CPUS as u32,
            memory_mb: vm_consts::DEFAULT_MEMORY_MB,
            disk_path: self.layout.vm_disk_path(vm_id),
            kernel_path: self.layout.vm_kernel_path(vm_id),
            initramfs_path: self.layout.vm_initramfs_path(vm_id),
            cloud_init_path: self.layout.vm_cloud_init_path(vm_id),
            ssh_port,
        }
    }

    fn marker_path(&self, vm_id: &str) -> PathBuf {
        self.layout.vm_running_marker_path(vm_id)
    }

    /// Read the marker file's recorded SSH port, if any VM is already
    /// believed to be running.
    fn read_marker(&self, vm_id: &str) -> Option<u16> {
        let contents = std::fs::read_to_string(self.marker_path(vm_id)).ok()?;
        contents.trim().parse().ok()
    }

    fn write_marker(&self, vm_id: &str, ssh_port: u16) -> ServinResult<()> {
        if let Some(parent) = self.marker_path(vm_id).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(self.marker_path(vm_id), ssh_port.to_string())?;
        Ok(())
    }

    fn remove_marker(&self, vm_id: &str) {
        let _ = std::fs::remove_file(self.marker_path(vm_id));
    }

    /// Idempotent boot (§8 property 5): if the marker file names a
    /// port the provider confirms is running, reuse it; otherwise
    /// provision artifacts and boot fresh. Concurrent callers for the
    /// same `vm_id` serialize on `vm_locks`.
    pub fn ensure_running(&self, vm_id: &str) -> ServinResult<VmConfig> {
        let lock = self.lock_for(vm_id);
        let _guard = lock.lock().unwrap();

        if let Some(ssh_port) = self.read_marker(vm_id) {
            let config = self.vm_config(vm_id, ssh_port);
            if self.provider.is_running(&config).unwrap_or(false) {
                return Ok(config);
            }
            self.remove_marker(vm_id);
        }

        let ssh_port = self.ports.lock().unwrap().allocate()?;
        let config = self.vm_config(vm_id, ssh_port);

        artifacts::ensure_alpine_artifacts(&config.kernel_path, &config.initramfs_path)?;
        crate::disk::create_blank_qcow2(&config.disk_path, vm_consts::DEFAULT_DISK_GB)?;
        cloud_init::generate(&config.cloud_init_path)?;

        self.provider.create(&config)?;
        self.provider.start(&config)?;
        self.write_marker(vm_id, ssh_port)?;

        if let Ok(exe) = std::env::current_exe() {
            let _ = self.provider.copy_to_vm(&config, &exe, vm_consts::GUEST_BINARY_PATH);
        }

        Ok(config)
    }

    pub fn shutdown(&self, vm_id: &str) -> ServinResult<()> {
        let lock = self.lock_for(vm_id);
        let _guard = lock.lock().unwrap();

        let ssh_port = match self.read_marker(vm_id) {
            Some(p) => p,
            None => return Ok(()),
        };
        let config = self.vm_config(vm_id, ssh_port);
        self.provider.stop(&config)?;
        self.remove_marker(vm_id);
        Ok(())
    }

    pub fn run_container(&self, vm_id: &str, argv: &[String]) -> ServinResult<GuestExecOutput> {
        let config = self.ensure_running(vm_id)?;
        self.provider.run_container(&config, argv)
    }

    pub fn list_containers(&self, vm_id: &str) -> ServinResult<GuestExecOutput> {
        let config = self.ensure_running(vm_id)?;
        self.provider.list_containers(&config)
    }

    pub fn stop_container(&self, vm_id: &str, container_ref: &str) -> ServinResult<GuestExecOutput> {
        let config = self.ensure_running(vm_id)?;
        self.provider.stop_container(&config, container_ref)
    }

    pub fn remove_container(&self, vm_id: &str, container_ref: &str) -> ServinResult<GuestExecOutput> {
        let config = self.ensure_running(vm_id)?;
        self.provider.remove_container(&config, container_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Pre-seed the kernel/initramfs/cloud-init paths `ensure_running`
    /// expects so `artifacts::ensure_alpine_artifacts` and
    /// `cloud_init::generate` take their already-present short-circuits
    /// instead of reaching out to the network or an ISO-generation tool
    /// that may not exist on the test host.
    fn seed_fake_artifacts(layout: &ServinLayout, vm_id: &str) {
        for path in [
            layout.vm_kernel_path(vm_id),
            layout.vm_initramfs_path(vm_id),
            layout.vm_cloud_init_path(vm_id),
        ] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"fake").unwrap();
        }
    }

    #[test]
    fn ensure_running_twice_reuses_the_same_ssh_port_s6() {
        let dir = tempdir().unwrap();
        let layout = ServinLayout::new(dir.path().to_path_buf());
        seed_fake_artifacts(&layout, "vm-a");
        let orchestrator = VmOrchestrator::with_provider(layout, ProviderKind::Development).unwrap();

        let first = orchestrator.ensure_running("vm-a").unwrap();
        let second = orchestrator.ensure_running("vm-a").unwrap();
        assert_eq!(first.ssh_port, second.ssh_port);
    }

    #[test]
    fn shutdown_then_ensure_running_allocates_a_fresh_session() {
        let dir = tempdir().unwrap();
        let layout = ServinLayout::new(dir.path().to_path_buf());
        seed_fake_artifacts(&layout, "vm-b");
        let orchestrator = VmOrchestrator::with_provider(layout, ProviderKind::Development).unwrap();

        orchestrator.ensure_running("vm-b").unwrap();
        orchestrator.shutdown("vm-b").unwrap();
        assert!(orchestrator.ensure_running("vm-b").is_ok());
    }

    #[test]
    fn concurrent_ensure_running_boots_at_most_once_s6() {
        let dir = tempdir().unwrap();
        let layout = ServinLayout::new(dir.path().to_path_buf());
        seed_fake_artifacts(&layout, "vm-c");
        let orchestrator = Arc::new(VmOrchestrator::with_provider(layout, ProviderKind::Development).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                std::thread::spawn(move || orchestrator.ensure_running("vm-c").unwrap())
            })
            .collect();
        let results: Vec<VmConfig> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let first_port = results[0].ssh_port;
        assert!(results.iter().all(|c| c.ssh_port == first_port), "all callers must observe the same boot");
        assert!(std::fs::read_to_string(dir.path().join("vms/vm-c/vm-running")).is_ok());
    }
}
