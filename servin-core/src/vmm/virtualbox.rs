//! VirtualBox provider (§4.6): last-resort backend on Windows hosts
//! with neither Hyper-V nor WSL2 available, driven via `VBoxManage`.

use std::process::Command;
use std::sync::Arc;

use servin_shared::{ServinError, ServinResult};

use super::registry::ProviderFactoryRegistration;
use super::{GuestExecOutput, ProviderKind, VmConfig, VmInfo, VmProvider, ssh};

pub struct VirtualBoxProvider;

fn vm_name(config: &VmConfig) -> String {
    format!("servin-{}", config.vm_id)
}

fn vboxmanage(args: &[&str]) -> ServinResult<std::process::Output> {
    Command::new("VBoxManage")
        .args(args)
        .output()
        .map_err(|e| ServinError::internal("virtualbox exec", e))
}

impl VmProvider for VirtualBoxProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::VirtualBox
    }

    fn is_host_capable(&self) -> bool {
        which::which("VBoxManage").is_ok()
    }

    fn create(&self, config: &VmConfig) -> ServinResult<()> {
        let name = vm_name(config);
        vboxmanage(&["createvm", "--name", &name, "--ostype", "Linux_64", "--register"])?;
        vboxmanage(&[
            "modifyvm",
            &name,
            "--memory",
            &config.memory_mb.to_string(),
            "--cpus",
            &config.cpus.to_string(),
            "--nic1",
            "nat",
        ])?;
        vboxmanage(&[
            "natpf1",
            &name,
            &format!("ssh,tcp,,{},,22", config.ssh_port),
        ])?;
        let out = vboxmanage(&[
            "storagectl",
            &name,
            "--name",
            "SATA",
            "--add",
            "sata",
        ])?;
        if !out.status.success() {
            return Err(ServinError::internal("virtualbox create", String::from_utf8_lossy(&out.stderr)));
        }
        vboxmanage(&[
            "storageattach",
            &name,
            "--storagectl",
            "SATA",
            "--port",
            "0",
            "--device",
            "0",
            "--type",
            "hdd",
            "--medium",
            &config.disk_path.display().to_string(),
        ])?;
        Ok(())
    }

    fn start(&self, config: &VmConfig) -> ServinResult<u32> {
        let name = vm_name(config);
        let out = vboxmanage(&["startvm", &name, "--type", "headless"])?;
        if !out.status.success() {
            return Err(ServinError::internal("virtualbox start", String::from_utf8_lossy(&out.stderr)));
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
        let _ = vboxmanage(&["controlvm", &name, "poweroff"]);
        Ok(())
    }

    fn destroy(&self, config: &VmConfig) -> ServinResult<()> {
        self.stop(config)?;
        let name = vm_name(config);
        let _ = vboxmanage(&["unregistervm", &name, "--delete"]);
        Ok(())
    }

    fn is_running(&self, config: &VmConfig) -> ServinResult<bool> {
        let name = vm_name(config);
        let out = vboxmanage(&["list", "runningvms"])?;
        Ok(String::from_utf8_lossy(&out.stdout).contains(&name))
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
        let out = vboxmanage(&[
            "controlvm",
            &name,
            "natpf1",
            &format!("p{host_port},tcp,,{host_port},,{guest_port}"),
        ])?;
        if !out.status.success() {
            return Err(ServinError::internal("virtualbox forward_port", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    fn remove_port_forward(&self, config: &VmConfig, host_port: u16) -> ServinResult<()> {
        let name = vm_name(config);
        let _ = vboxmanage(&["controlvm", &name, "natpf1", "delete", &format!("p{host_port}")]);
        Ok(())
    }
}

fn create() -> Arc<dyn VmProvider> {
    Arc::new(VirtualBoxProvider)
}

inventory::submit! { ProviderFactoryRegistration { kind: ProviderKind::VirtualBox, factory: create } }
