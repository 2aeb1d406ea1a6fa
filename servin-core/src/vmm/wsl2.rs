//! WSL2 provider (§4.6): runs the guest as a WSL2 distro rather than a
//! standalone qemu/Hyper-V VM, using `wsl.exe --import`/`--unregister`
//! and `wsl.exe -d <name>` for exec. Falls back to this when Hyper-V
//! itself is unavailable but the WSL2 platform feature is.

use std::process::Command;
use std::sync::Arc;

use servin_shared::{ServinError, ServinResult};

use super::registry::ProviderFactoryRegistration;
use super::{GuestExecOutput, ProviderKind, VmConfig, VmInfo, VmProvider};

pub struct Wsl2Provider;

fn distro_name(config: &VmConfig) -> String {
    format!("servin-{}", config.vm_id)
}

fn wsl(args: &[&str]) -> ServinResult<std::process::Output> {
    Command::new("wsl.exe")
        .args(args)
        .output()
        .map_err(|e| ServinError::internal("wsl2 exec", e))
}

impl VmProvider for Wsl2Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Wsl2
    }

    fn is_host_capable(&self) -> bool {
        cfg!(target_os = "windows") && which::which("wsl.exe").is_ok()
    }

    fn create(&self, config: &VmConfig) -> ServinResult<()> {
        let name = distro_name(config);
        let install_dir = config.disk_path.parent().unwrap_or(std::path::Path::new("."));
        let out = wsl(&[
            "--import",
            &name,
            &install_dir.display().to_string(),
            &config.disk_path.display().to_string(),
        ])?;
        if !out.status.success() {
            return Err(ServinError::internal("wsl2 create", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    fn start(&self, config: &VmConfig) -> ServinResult<u32> {
        let name = distro_name(config);
        let out = wsl(&["-d", &name, "-e", "true"])?;
        if !out.status.success() {
            return Err(ServinError::internal("wsl2 start", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(0)
    }

    fn stop(&self, config: &VmConfig) -> ServinResult<()> {
        let name = distro_name(config);
        let _ = wsl(&["--terminate", &name]);
        Ok(())
    }

    fn destroy(&self, config: &VmConfig) -> ServinResult<()> {
        let name = distro_name(config);
        self.stop(config)?;
        let _ = wsl(&["--unregister", &name]);
        Ok(())
    }

    fn is_running(&self, config: &VmConfig) -> ServinResult<bool> {
        let name = distro_name(config);
        let out = wsl(&["--list", "--running", "--quiet"])?;
        Ok(String::from_utf8_lossy(&out.stdout).lines().any(|l| l.trim() == name))
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
        let name = distro_name(config);
        let mut args = vec!["-d".to_string(), name, "-e".to_string(), servin_shared::constants::vm::GUEST_BINARY_PATH.to_string()];
        args.extend(argv.iter().cloned());
        let out = wsl(&args.iter().map(String::as_str).collect::<Vec<_>>())?;
        Ok(GuestExecOutput {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            exit_code: out.status.code().unwrap_or(-1),
        })
    }

    fn list_containers(&self, config: &VmConfig) -> ServinResult<GuestExecOutput> {
        self.run_container(config, &["list".to_string()])
    }

    fn stop_container(&self, config: &VmConfig, container_ref: &str) -> ServinResult<GuestExecOutput> {
        self.run_container(config, &["stop".to_string(), container_ref.to_string()])
    }

    fn remove_container(&self, config: &VmConfig, container_ref: &str) -> ServinResult<GuestExecOutput> {
        self.run_container(config, &["rm".to_string(), container_ref.to_string()])
    }

    fn copy_to_vm(&self, config: &VmConfig, local: &std::path::Path, remote: &str) -> ServinResult<()> {
        let name = distro_name(config);
        let out = wsl(&["-d", &name, "cp", &local.display().to_string(), remote])?;
        if !out.status.success() {
            return Err(ServinError::internal("wsl2 copy_to_vm", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    fn copy_from_vm(&self, config: &VmConfig, remote: &str, local: &std::path::Path) -> ServinResult<()> {
        let name = distro_name(config);
        let out = wsl(&["-d", &name, "cp", remote, &local.display().to_string()])?;
        if !out.status.success() {
            return Err(ServinError::internal("wsl2 copy_from_vm", String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }

    fn forward_port(&self, _config: &VmConfig, _host_port: u16, _guest_port: u16) -> ServinResult<()> {
        // WSL2's NAT forwards localhost ports automatically; nothing to do.
        Ok(())
    }

    fn remove_port_forward(&self, _config: &VmConfig, _host_port: u16) -> ServinResult<()> {
        Ok(())
    }
}

fn create() -> Arc<dyn VmProvider> {
    Arc::new(Wsl2Provider)
}

inventory::submit! { ProviderFactoryRegistration { kind: ProviderKind::Wsl2, factory: create } }
