//! Platform Primitives (non-Linux) — §4.2.
//!
//! Every isolation primitive reports `PlatformUnsupported`; the
//! Lifecycle Engine consults [`super::native_containers_supported`]
//! and routes through the Dispatcher/VM path on these hosts instead of
//! calling these functions at all. They exist so the Lifecycle Engine
//! has one call shape regardless of host OS (§9).

use super::{Entrypoint, IsolationConfig, Limits};
use servin_shared::{ServinError, ServinResult};

pub fn setup_isolation(cfg: &IsolationConfig) -> ServinResult<()> {
    Err(ServinError::PlatformUnsupported(format!(
        "native namespace isolation is unavailable on this host; container {} must run in the guest VM",
        cfg.container_id
    )))
}

pub fn apply_limits(container_id: &str, _limits: &Limits) -> ServinResult<()> {
    Err(ServinError::PlatformUnsupported(format!(
        "cgroup limits are unavailable on this host for container {container_id}"
    )))
}

pub fn exec_entrypoint(_entrypoint: &Entrypoint) -> ServinResult<std::convert::Infallible> {
    Err(ServinError::PlatformUnsupported(
        "direct entrypoint exec is unavailable on this host".into(),
    ))
}
