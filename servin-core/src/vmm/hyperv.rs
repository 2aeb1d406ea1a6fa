//! Hyper-V provider (§4.6): drives `New-VM`/`Start-VM`/`Stop-VM` via
//! PowerShell. Preferred over WSL2/VirtualBox on Windows hosts where
//! the Hyper-V feature is enabled (§4.6 priority order).

use std::process::Command;
use std::sync::Arc;

use servin_shared::{ServinError, ServinResult};

use super::registry::ProviderFactoryRegistration;
use super::{GuestExecOutput, ProviderKind, VmConfig, VmInfo, VmProvider, ssh};

pub struct HyperVProvider;

fn powershell(script: &str) -> ServinResult<std::process::Output> {
    Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", script])
        .output()
        .map_err(|e| ServinError::internal("hyperv powershell", e))
}

fn vm_name(config: &VmConfig) -> String {
    format!("servin-{}", config.vm_id)
}

impl VmProvider for HyperVProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HyperV
    }

    fn is_host_capable(&self) -> bool {
        cfg!(target_os = "windows")
            && powershell("Get-Command Get-VM -ErrorAction SilentlyContinue")
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    fn create(&self, config: &VmConfig) -> ServinResult<()> {
        let name = vm_name(config);
        let script = format!(
            "New-VM -Name '{name}' -MemoryStartupBytes {}MB -Generation 1 -NoVHD; \
             Set-VMProcessor -VMName '{name}' -Count {}; \
             Add-VMHardDiskDrive -VMName '{name}' -Path '{}'",
            config.memory_mb,
            config.cpus,
            config.disk_path.display(),
        );
        let out = powershell(&script)?;
        if !out.status.success() {
            return Err(ServinError::internal("hyperv create", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    fn start(&self, config: &VmConfig) -> ServinResult<u32> {
        let name = vm_name(config);
        let out = powershell(&format!("Start-VM -Name '{name}'"))?;
        if !out.status.success() {
            return Err(ServinError::internal("hyperv start", String::from_utf8_lossy(&out.stderr)));
        }
        ssh::wait_until_ready(config.ssh_port)?;
        Ok(0)
    }

    fn stop(&self, config: &VmConfig) -> ServinResult<()> {
        let _ = ssh::run(config.ssh_port, "shutdown -h now");
        std::thread::sleep(std::time::Duration::from_secs(
            servin_shared::constants::vm::GRACEFUL_STOP_TIMEOUT_SECS,
        ));
        let name = vm_name(config);
        let _ = powershell(&format!("Stop-VM -Name '{name}' -Force -TurnOff"));
        Ok(())
    }

    fn destroy(&self, config: &VmConfig) -> ServinResult<()> {
        self.stop(config)?;
        let name = vm_name(config);
        let _ = powershell(&format!("Remove-VM -Name '{name}' -Force"));
        Ok(())
    }

    fn is_running(&self, config: &VmConfig) -> ServinResult<bool> {
        let name = vm_name(config);
        let out = powershell(&format!("(Get-VM -Name '{name}').State"))?;
        Ok(String::from_utf8_lossy(&out.stdout).trim() == "Running")
    }

    fn get_info(&self, config: &VmConfig) -> ServinResult<VmInfo> {
        Ok(VmInfo {
            vm_id: config.vm_id.clone(),
            running: self.is_running(config).unwrap_or(false),
            pid: None,
            ssh_port: config.ssh_port,
        })
    }

    fn run_container(&self, config: &VmConfig, argv: &[String]) -> ServinResult<GuestExecOutput> {
        ssh::run_argv(config.ssh_port, argv)
    }

    fn list_containers(&self, config: &VmConfig) -> ServinResult<GuestExecOutput> {
        ssh::run_argv(config.ssh_port, &["list".to_string()])
    }

    fn stop_container(&self, config: &VmConfig, container_ref: &str) -> ServinResult<GuestExecOutput> {
        ssh::run_argv(config.ssh_port, &["stop".to_string(), container_ref.to_string()])
    }

    fn remove_container(&self, config: &VmConfig, container_ref: &str) -> ServinResult<GuestExecOutput> {
        ssh::run_argv(config.ssh_port, &["rm".to_string(), container_ref.to_string()])
    }

    fn copy_to_vm(&self, config: &VmConfig, local: &std::path::Path, remote: &str) -> ServinResult<()> {
        ssh::copy_to_vm(config.ssh_port, local, remote)
    }

    fn copy_from_vm(&self, config: &VmConfig, remote: &str, local: &std::path::Path) -> ServinResult<()> {
        ssh::copy_from_vm(config.ssh_port, remote, local)
    }

    fn forward_port(&self, config: &VmConfig, host_port: u16, guest_port: u16) -> ServinResult<()> {
        let name = vm_name(config);
        let script = format!(
            "Get-VMNetworkAdapter -VMName '{name}' | Add-VMNetworkAdapterRoutingDomainMapping -PortNumber {host_port} -GuestPort {guest_port}"
        );
        let out = powershell(&script)?;
        if !out.status.success() {
            return Err(ServinError::internal("hyperv forward_port", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    fn remove_port_forward(&self, _config: &VmConfig, _host_port: u16) -> ServinResult<()> {
        Ok(())
    }
}

fn create() -> Arc<dyn VmProvider> {
    Arc::new(HyperVProvider)
}

inventory::submit! { ProviderFactoryRegistration { kind: ProviderKind::HyperV, factory: create } }
