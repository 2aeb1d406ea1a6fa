//! Host virtualization-capability probing (§4.6): which providers this
//! particular machine can actually run, in priority order.

use super::ProviderKind;
use super::registry::{available_providers, create_provider};

/// Registered providers this host reports itself capable of running,
/// in the priority order §4.6 specifies: on Windows, Hyper-V is
/// preferred over WSL2 over VirtualBox; on macOS, Hypervisor.framework
/// QEMU is the only real backend; on Linux with `/dev/kvm` unreadable
/// (the native path already covers readable /dev/kvm hosts), KVM-accelerated
/// QEMU is still attempted before falling back to the `Development`
/// provider.
pub fn detect_available_providers() -> Vec<ProviderKind> {
    let priority: &[ProviderKind] = if cfg!(target_os = "windows") {
        &[ProviderKind::HyperV, ProviderKind::Wsl2, ProviderKind::VirtualBox]
    } else if cfg!(target_os = "macos") {
        &[ProviderKind::HypervisorQemu]
    } else {
        &[ProviderKind::Kvm]
    };

    let mut found: Vec<ProviderKind> = priority
        .iter()
        .copied()
        .filter(|k| available_providers().contains(k))
        .filter(|k| create_provider(*k).map(|p| p.is_host_capable()).unwrap_or(false))
        .collect();

    if !found.contains(&ProviderKind::Development) && available_providers().contains(&ProviderKind::Development) {
        found.push(ProviderKind::Development);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_is_always_in_the_detected_list() {
        assert!(detect_available_providers().contains(&ProviderKind::Development));
    }
}
