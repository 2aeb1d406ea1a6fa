//! Compile-time provider registration via `inventory`, generalizing the
//! teacher's `EngineFactoryRegistration` pattern from two `VmmKind`
//! variants (`Libkrun`, `Firecracker`) to the six `ProviderKind`
//! backends §4.6 names. No manual registry map — each provider module
//! submits its own factory.

use std::sync::Arc;

use servin_shared::{ServinError, ServinResult};

use super::{ProviderKind, VmProvider};

pub type ProviderFactoryFn = fn() -> Arc<dyn VmProvider>;

pub struct ProviderFactoryRegistration {
    pub kind: ProviderKind,
    pub factory: ProviderFactoryFn,
}

inventory::collect!(ProviderFactoryRegistration);

/// Create the provider for `kind`, regardless of whether this host can
/// actually run it — callers that need a runnable provider should
/// additionally check [`is_available`] or go through
/// [`super::detect_available_providers`].
pub fn create_provider(kind: ProviderKind) -> ServinResult<Arc<dyn VmProvider>> {
    for registration in inventory::iter::<ProviderFactoryRegistration> {
        if registration.kind == kind {
            return Ok((registration.factory)());
        }
    }
    let available: Vec<_> = available_providers().into_iter().map(|k| k.as_str()).collect();
    Err(ServinError::ProviderUnavailable(format!(
        "provider {:?} is not registered; compiled providers: {:?}",
        kind, available
    )))
}

/// True when `kind` is both registered and reports itself host-capable.
pub fn is_available(kind: ProviderKind) -> bool {
    create_provider(kind).map(|p| p.is_host_capable()).unwrap_or(false)
}

pub fn available_providers() -> Vec<ProviderKind> {
    inventory::iter::<ProviderFactoryRegistration>().map(|r| r.kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_provider_is_always_registered() {
        let available = available_providers();
        assert!(available.contains(&ProviderKind::Development));
    }

    #[test]
    fn development_provider_is_always_host_capable() {
        assert!(is_available(ProviderKind::Development));
    }

    #[test]
    fn unregistered_kind_on_this_host_is_an_error_not_a_panic() {
        // On a typical CI/dev host without the necessary hypervisor
        // bound in, at least one of these should report unavailable
        // without panicking.
        let _ = create_provider(ProviderKind::HyperV);
    }
}
