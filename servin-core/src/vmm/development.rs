//! `Development` provider (§4.6): a VM-shaped backend that never
//! actually boots a VM. It exists so the orchestrator, dispatcher, and
//! CLI can be exercised end-to-end on any host — including CI — without
//! a hypervisor, the same role the teacher reserves for its
//! always-available default engine registration in tests.

use std::sync::Arc;
use std::sync::Mutex;

use servin_shared::ServinResult;

use super::registry::ProviderFactoryRegistration;
use super::{GuestExecOutput, ProviderKind, VmConfig, VmInfo, VmProvider};

#[derive(Default)]
pub struct DevelopmentProvider {
    running: Mutex<std::collections::HashSet<String>>,
}

impl VmProvider for DevelopmentProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Development
    }

    fn is_host_capable(&self) -> bool {
        true
    }

    fn create(&self, _config: &VmConfig) -> ServinResult<()> {
        Ok(())
    }

    fn start(&self, config: &VmConfig) -> ServinResult<u32> {
        self.running.lock().unwrap().insert(config.vm_id.clone());
        Ok(std::process::id())
    }

    fn stop(&self, config: &VmConfig) -> ServinResult<()> {
        self.running.lock().unwrap().remove(&config.vm_id);
        Ok(())
    }

    fn destroy(&self, config: &VmConfig) -> ServinResult<()> {
        self.running.lock().unwrap().remove(&config.vm_id);
        Ok(())
    }

    fn is_running(&self, config: &VmConfig) -> ServinResult<bool> {
        Ok(self.running.lock().unwrap().contains(&config.vm_id))
    }

    fn get_info(&self, config: &VmConfig) -> ServinResult<VmInfo> {
        Ok(VmInfo {
            vm_id: config.vm_id.clone(),
            running: self.running.lock().unwrap().contains(&config.vm_id),
            pid: Some(std::process::id()),
            ssh_port: config.ssh_port,
        })
    }

    fn run_container(&self, _config: &VmConfig, argv: &[String]) -> ServinResult<GuestExecOutput> {
        Ok(GuestExecOutput { stdout: format!("development: would run {argv:?}\n"), stderr: String::new(), exit_code: 0 })
    }

    fn list_containers(&self, _config: &VmConfig) -> ServinResult<GuestExecOutput> {
        Ok(GuestExecOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 })
    }

    fn stop_container(&self, _config: &VmConfig, _container_ref: &str) -> ServinResult<GuestExecOutput> {
        Ok(GuestExecOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 })
    }

    fn remove_container(&self, _config: &VmConfig, _container_ref: &str) -> ServinResult<GuestExecOutput> {
        Ok(GuestExecOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 })
    }

    fn copy_to_vm(&self, _config: &VmConfig, _local: &std::path::Path, _remote: &str) -> ServinResult<()> {
        Ok(())
    }

    fn copy_from_vm(&self, _config: &VmConfig, _remote: &str, _local: &std::path::Path) -> ServinResult<()> {
        Ok(())
    }

    fn forward_port(&self, _config: &VmConfig, _host_port: u16, _guest_port: u16) -> ServinResult<()> {
        Ok(())
    }

    fn remove_port_forward(&self, _config: &VmConfig, _host_port: u16) -> ServinResult<()> {
        Ok(())
    }
}

fn create() -> Arc<dyn VmProvider> {
    Arc::new(DevelopmentProvider::default())
}

inventory::submit! { ProviderFactoryRegistration { kind: ProviderKind::Development, factory: create } }

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> VmConfig {
        VmConfig {
            vm_id: "test-vm".into(),
            cpus: 1,
            memory_mb: 512,
            disk_path: "/tmp/disk.qcow2".into(),
            kernel_path: "/tmp/vmlinuz".into(),
            initramfs_path: "/tmp/initramfs".into(),
            cloud_init_path: "/tmp/cloud-init.iso".into(),
            ssh_port: 2222,
        }
    }

    #[test]
    fn start_then_stop_is_idempotent_s6() {
        let provider = DevelopmentProvider::default();
        let config = sample_config();
        provider.start(&config).unwrap();
        assert!(provider.is_running(&config).unwrap());
        provider.start(&config).unwrap();
        assert!(provider.is_running(&config).unwrap());
        provider.stop(&config).unwrap();
        assert!(!provider.is_running(&config).unwrap());
    }
}
