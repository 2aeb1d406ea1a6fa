//! Platform Primitives (§4.1/§4.2): the single module with host-OS
//! conditionals. The Lifecycle Engine never branches on OS itself — it
//! calls [`setup_isolation`]/[`apply_limits`]/[`exec_entrypoint`] and
//! lets this module decide whether that means real namespace/cgroup
//! work (Linux) or `PlatformUnsupported` (everywhere else), per §9's
//! "Platform-specific code paths belong behind a single Platform
//! Primitives module" note.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod stub;

use servin_shared::ServinResult;
use std::collections::HashMap;
use std::path::PathBuf;

/// Isolation configuration passed to `setup_isolation` (§4.1).
#[derive(Debug, Clone)]
pub struct IsolationConfig {
    pub container_id: String,
    pub rootfs: PathBuf,
    pub hostname: String,
    pub user_namespace: bool,
    /// Bind mounts from host path (or volume data dir) to container path.
    pub mounts: Vec<BindMount>,
}

#[derive(Debug, Clone)]
pub struct BindMount {
    pub source: PathBuf,
    pub destination: String,
    pub read_only: bool,
}

/// Resource limits already parsed from human-readable quantities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub memory_bytes: Option<u64>,
    pub cpu_weight: Option<f64>,
}

/// The process to exec as the container's entrypoint.
#[derive(Debug, Clone)]
pub struct Entrypoint {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: String,
}

/// Create the configured set of namespaces, hostname, `/proc` `/sys`
/// `/dev` mounts, and pivot into `cfg.rootfs` (§4.1). On non-Linux
/// hosts this always returns `PlatformUnsupported` (§4.2) so the
/// Lifecycle Engine routes through the Dispatcher/VM path instead.
pub fn setup_isolation(cfg: &IsolationConfig) -> ServinResult<()> {
    #[cfg(target_os = "linux")]
    {
        linux::setup_isolation(cfg)
    }
    #[cfg(not(target_os = "linux"))]
    {
        stub::setup_isolation(cfg)
    }
}

/// Write cgroup memory/CPU entries for the given limits (§4.1).
pub fn apply_limits(container_id: &str, limits: &Limits) -> ServinResult<()> {
    #[cfg(target_os = "linux")]
    {
        linux::apply_limits(container_id, limits)
    }
    #[cfg(not(target_os = "linux"))]
    {
        stub::apply_limits(container_id, limits)
    }
}

/// Replace the current process image with `entrypoint` (§4.1). Never
/// returns on success.
pub fn exec_entrypoint(entrypoint: &Entrypoint) -> ServinResult<std::convert::Infallible> {
    #[cfg(target_os = "linux")]
    {
        linux::exec_entrypoint(entrypoint)
    }
    #[cfg(not(target_os = "linux"))]
    {
        stub::exec_entrypoint(entrypoint)
    }
}

/// The Lifecycle Engine's actual Linux start path: create and start a
/// libcontainer-managed init process per `cfg`/`entrypoint` in one
/// call, returning its host PID (§4.1/§4.5). `PlatformUnsupported`
/// everywhere else.
pub fn run_native_container(cfg: &IsolationConfig, entrypoint: &Entrypoint) -> ServinResult<i32> {
    #[cfg(target_os = "linux")]
    {
        linux::run_container(cfg, entrypoint)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = (cfg, entrypoint);
        Err(servin_shared::ServinError::PlatformUnsupported(
            "native container execution is only implemented on Linux".into(),
        ))
    }
}

/// True when the native container path is usable on this host at all
/// (Linux with the needed privileges); false routes every start/exec
/// through the Dispatcher.
pub fn native_containers_supported() -> bool {
    cfg!(target_os = "linux")
}

/// Parse a human-readable resource quantity (§4.1): `128m`/`256M`
/// (mebibytes), `1g`/`2G` (gibibytes), a bare integer (bytes), or a
/// bare float (a CPU share, e.g. `0.5`). Returns bytes for memory
/// quantities and the raw float for CPU shares — callers know which
/// they asked for.
pub fn parse_memory_quantity(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(num) = s.strip_suffix(['g', 'G']) {
        return num.trim().parse::<f64>().ok().map(|n| (n * 1024.0 * 1024.0 * 1024.0) as u64);
    }
    if let Some(num) = s.strip_suffix(['m', 'M']) {
        return num.trim().parse::<f64>().ok().map(|n| (n * 1024.0 * 1024.0) as u64);
    }
    if let Some(num) = s.strip_suffix(['k', 'K']) {
        return num.trim().parse::<f64>().ok().map(|n| (n * 1024.0) as u64);
    }
    s.parse::<u64>().ok()
}

pub fn parse_cpu_quantity(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|w| *w > 0.0)
}

/// Resolve a `KEY=value` list plus a base map into the ordered
/// environment the entrypoint should see, user entries overriding
/// base ones of the same key while preserving first-seen order.
pub fn merge_env(base: &[(String, String)], overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, String> = HashMap::new();
    for (k, v) in base.iter().chain(overrides.iter()) {
        if !map.contains_key(k) {
            order.push(k.clone());
        }
        map.insert(k.clone(), v.clone());
    }
    order.into_iter().map(|k| { let v = map.remove(&k).unwrap(); (k, v) }).collect()
}

/// Join a container's existing Linux namespaces for `exec` (§4.5):
/// opens `/proc/<pid>/ns/*` and `setns`s into each. No-op stub on
/// non-Linux (callers route through the Dispatcher there).
pub fn join_namespaces(pid: u32) -> ServinResult<()> {
    #[cfg(target_os = "linux")]
    {
        linux::join_namespaces(pid)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        Err(servin_shared::ServinError::PlatformUnsupported(
            "namespace join is only implemented on Linux".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_quantity_suffixes() {
        assert_eq!(parse_memory_quantity("128m"), Some(128 * 1024 * 1024));
        assert_eq!(parse_memory_quantity("1g"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_quantity("512"), Some(512));
        assert_eq!(parse_memory_quantity("2G"), Some(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn cpu_quantity_is_a_bare_float() {
        assert_eq!(parse_cpu_quantity("0.5"), Some(0.5));
        assert_eq!(parse_cpu_quantity("0"), None);
        assert_eq!(parse_cpu_quantity("abc"), None);
    }

    #[test]
    fn merge_env_overrides_preserve_first_seen_order() {
        let base = vec![("A".to_string(), "1".to_string()), ("B".to_string(), "2".to_string())];
        let overrides = vec![("B".to_string(), "9".to_string()), ("C".to_string(), "3".to_string())];
        let merged = merge_env(&base, &overrides);
        assert_eq!(
            merged,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "9".to_string()),
                ("C".to_string(), "3".to_string()),
            ]
        );
    }
}
