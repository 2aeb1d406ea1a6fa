//! VM Provider Interface (§4.6): the pluggable guest-VM backends used
//! on hosts where [`crate::platform::native_containers_supported`] is
//! false. Each backend implements [`VmProvider`] and self-registers via
//! `inventory::submit!`, generalizing the teacher's `EngineFactoryRegistration`
//! pattern (there keyed by `VmmKind::{Libkrun, Firecracker}`) to the
//! six backends §4.6 names.

mod development;
mod host_check;
mod hyperv;
mod qemu;
mod registry;
pub mod ssh;
mod virtualbox;
mod wsl2;

pub use host_check::detect_available_providers;
pub use registry::{ProviderFactoryRegistration, available_providers, create_provider, is_available};

use std::path::PathBuf;

use servin_shared::ServinResult;

/// The six guest-VM backends §4.6 names, in host-capability probing
/// priority order where more than one could apply to the same host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Kvm,
    HypervisorQemu,
    HyperV,
    Wsl2,
    VirtualBox,
    Development,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Kvm => "kvm",
            ProviderKind::HypervisorQemu => "hypervisor-qemu",
            ProviderKind::HyperV => "hyperv",
            ProviderKind::Wsl2 => "wsl2",
            ProviderKind::VirtualBox => "virtualbox",
            ProviderKind::Development => "development",
        }
    }
}

/// Everything a provider needs to boot one guest VM (§4.7 artifacts).
#[derive(Debug, Clone)]
pub struct VmConfig {
    pub vm_id: String,
    pub cpus: u32,
    pub memory_mb: u32,
    pub disk_path: PathBuf,
    pub kernel_path: PathBuf,
    pub initramfs_path: PathBuf,
    pub cloud_init_path: PathBuf,
    pub ssh_port: u16,
}

#[derive(Debug, Clone)]
pub struct VmInfo {
    pub vm_id: String,
    pub running: bool,
    pub pid: Option<u32>,
    pub ssh_port: u16,
}

/// Output of running one container's entrypoint inside the guest,
/// combining stdout+stderr the way the Dispatcher expects (§4.8).
#[derive(Debug, Clone)]
pub struct GuestExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A guest-VM backend (§4.6). Every method is synchronous and blocking
/// per the runtime's thread-based concurrency model (§9) — callers that
/// need concurrency spawn their own `std::thread`.
pub trait VmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// True when this host can actually run this provider right now
    /// (kernel module loaded, hypervisor feature present, required
    /// binaries on `PATH`). Checked once at registry resolution time.
    fn is_host_capable(&self) -> bool;

    fn create(&self, config: &VmConfig) -> ServinResult<()>;
    fn start(&self, config: &VmConfig) -> ServinResult<u32>;
    fn stop(&self, config: &VmConfig) -> ServinResult<()>;
    fn destroy(&self, config: &VmConfig) -> ServinResult<()>;
    fn is_running(&self, config: &VmConfig) -> ServinResult<bool>;
    fn get_info(&self, config: &VmConfig) -> ServinResult<VmInfo>;

    /// Run `argv` (the canonical `servin` CLI invocation the Dispatcher
    /// built, §4.8) inside the guest over SSH and capture its output.
    fn run_container(&self, config: &VmConfig, argv: &[String]) -> ServinResult<GuestExecOutput>;
    fn list_containers(&self, config: &VmConfig) -> ServinResult<GuestExecOutput>;
    fn stop_container(&self, config: &VmConfig, container_ref: &str) -> ServinResult<GuestExecOutput>;
    fn remove_container(&self, config: &VmConfig, container_ref: &str) -> ServinResult<GuestExecOutput>;

    fn copy_to_vm(&self, config: &VmConfig, local: &std::path::Path, remote: &str) -> ServinResult<()>;
    fn copy_from_vm(&self, config: &VmConfig, remote: &str, local: &std::path::Path) -> ServinResult<()>;

    fn forward_port(&self, config: &VmConfig, host_port: u16, guest_port: u16) -> ServinResult<()>;
    fn remove_port_forward(&self, config: &VmConfig, host_port: u16) -> ServinResult<()>;
}
