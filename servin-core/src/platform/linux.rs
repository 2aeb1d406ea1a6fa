//! Platform Primitives (Linux) — §4.1.
//!
//! Namespace/mount/pivot_root/cgroup mechanics are not hand-rolled with
//! raw `nix::sched::unshare` calls: the corpus already reaches for
//! `oci-spec` (runtime-spec builders) and `libcontainer`
//! (`ContainerBuilder`, the same crate the teacher's guest-side
//! container runtime uses) for exactly this job, so this module builds
//! an OCI bundle and drives it through `libcontainer` instead.
//!
//! One divergence from the teacher: `guest/src/container/spec.rs`
//! disables the cgroup namespace and `/sys/fs/cgroup` mount "for
//! performance" under a single-tenant-in-VM assumption. `servin` is a
//! general-purpose runtime that must honor `apply_limits`, so the
//! cgroup namespace, its mount, and `cgroups_path` stay enabled here.

use std::fs;
use std::path::{Path, PathBuf};

use libcontainer::container::builder::ContainerBuilder;
use libcontainer::syscall::syscall::SyscallType;
use oci_spec::runtime::{
    LinuxBuilder, LinuxCapabilitiesBuilder, LinuxNamespaceBuilder, LinuxNamespaceType,
    LinuxResourcesBuilder, LinuxMemoryBuilder, LinuxCpuBuilder, MountBuilder, PosixRlimitBuilder,
    PosixRlimitType, ProcessBuilder, RootBuilder, Spec, SpecBuilder,
};
use servin_shared::constants::container as container_consts;
use servin_shared::{ServinError, ServinResult};

use super::{Entrypoint, IsolationConfig, Limits};

fn internal(op: &str, e: impl std::fmt::Display) -> ServinError {
    ServinError::internal(op, e)
}

/// Namespace set a container gets by default (§4.1: mount, PID, UTS,
/// IPC, network, optionally user).
fn build_namespaces(user_namespace: bool) -> ServinResult<Vec<oci_spec::runtime::LinuxNamespace>> {
    let mut kinds = vec![
        LinuxNamespaceType::Pid,
        LinuxNamespaceType::Mount,
        LinuxNamespaceType::Ipc,
        LinuxNamespaceType::Uts,
        LinuxNamespaceType::Network,
        LinuxNamespaceType::Cgroup,
    ];
    if user_namespace {
        kinds.push(LinuxNamespaceType::User);
    }
    kinds
        .into_iter()
        .map(|typ| {
            LinuxNamespaceBuilder::default()
                .typ(typ)
                .build()
                .map_err(|e| internal("build_namespaces", e))
        })
        .collect()
}

/// `/proc`, `/sys`, and a tmpfs-backed `/dev` carrying the basic char
/// devices (§4.1). Device nodes themselves are created by `libcontainer`
/// from the mount's device list at container start, mirroring
/// `guest/src/container/spec.rs::build_standard_mounts`.
fn build_standard_mounts() -> ServinResult<Vec<oci_spec::runtime::Mount>> {
    let specs: &[(&str, &str, &[&str])] = &[
        ("/proc", "proc", &[]),
        ("/dev", "tmpfs", &["nosuid", "strictatime", "mode=755", "size=65536k"]),
        ("/dev/pts", "devpts", &["nosuid", "noexec", "newinstance", "ptmxmode=0666", "mode=0620"]),
        ("/dev/shm", "tmpfs", &["nosuid", "noexec", "nodev", "mode=1777"]),
        ("/sys", "sysfs", &["nosuid", "noexec", "nodev", "ro"]),
        ("/sys/fs/cgroup", "cgroup", &["nosuid", "noexec", "nodev", "relatime", "ro"]),
    ];
    specs
        .iter()
        .map(|(dest, typ, opts)| {
            MountBuilder::default()
                .destination(PathBuf::from(dest))
                .typ(*typ)
                .source(PathBuf::from(*typ))
                .options(opts.iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .build()
                .map_err(|e| internal("build_standard_mounts", e))
        })
        .collect()
}

fn build_bind_mounts(cfg: &IsolationConfig) -> ServinResult<Vec<oci_spec::runtime::Mount>> {
    cfg.mounts
        .iter()
        .map(|m| {
            let options = if m.read_only {
                vec!["bind".to_string(), "ro".to_string()]
            } else {
                vec!["bind".to_string(), "rw".to_string()]
            };
            MountBuilder::default()
                .destination(PathBuf::from(&m.destination))
                .typ("bind")
                .source(m.source.clone())
                .options(options)
                .build()
                .map_err(|e| internal("build_bind_mounts", e))
        })
        .collect()
}

/// Build the OCI runtime spec for one container. `setup_isolation`
/// writes this into the bundle's `config.json`; `apply_limits` mutates
/// its `linux.resources` before that write.
fn build_spec(cfg: &IsolationConfig, entrypoint: &Entrypoint) -> ServinResult<Spec> {
    let mut mounts = build_standard_mounts()?;
    mounts.extend(build_bind_mounts(cfg)?);

    let caps = LinuxCapabilitiesBuilder::default().build().map_err(|e| internal("build_spec", e))?;

    let rlimits = vec![
        PosixRlimitBuilder::default()
            .typ(PosixRlimitType::RlimitNofile)
            .hard(container_consts::RLIMIT_NOFILE_HARD)
            .soft(container_consts::RLIMIT_NOFILE_SOFT)
            .build()
            .map_err(|e| internal("build_spec", e))?,
    ];

    let env: Vec<String> = entrypoint.env.iter().map(|(k, v)| format!("{k}={v}")).collect();

    let process = ProcessBuilder::default()
        .terminal(false)
        .cwd(PathBuf::from(&entrypoint.working_dir))
        .env(env)
        .args(entrypoint.argv.clone())
        .capabilities(caps)
        .rlimits(rlimits)
        .no_new_privileges(false)
        .build()
        .map_err(|e| internal("build_spec", e))?;

    let root = RootBuilder::default()
        .path(cfg.rootfs.clone())
        .readonly(false)
        .build()
        .map_err(|e| internal("build_spec", e))?;

    let linux = LinuxBuilder::default()
        .namespaces(build_namespaces(cfg.user_namespace)?)
        .build()
        .map_err(|e| internal("build_spec", e))?;

    SpecBuilder::default()
        .version("1.0.2")
        .hostname(cfg.hostname.clone())
        .root(root)
        .mounts(mounts)
        .process(process)
        .linux(linux)
        .build()
        .map_err(|e| internal("build_spec", e))
}

fn bundle_dir(container_id: &str) -> PathBuf {
    std::env::temp_dir().join("servin-bundles").join(container_id)
}

fn state_dir(container_id: &str) -> PathBuf {
    std::env::temp_dir().join("servin-state").join(container_id)
}

/// §4.1 `setup_isolation`: build the OCI spec and write the bundle.
/// The actual namespace/mount/pivot_root work happens inside
/// `libcontainer` when [`exec_entrypoint`] creates the init process —
/// this phase only prepares the bundle the way a build-time "prepare"
/// step would (§9: prepare before execute).
pub fn setup_isolation(cfg: &IsolationConfig) -> ServinResult<()> {
    let bundle = bundle_dir(&cfg.container_id);
    fs::create_dir_all(&bundle)?;

    // A placeholder entrypoint; `exec_entrypoint` overwrites `process`
    // with the real one once limits have been applied, keeping the
    // three-call shape of §4.1 even though the bundle is one artifact.
    let placeholder = Entrypoint { argv: vec!["/bin/true".to_string()], env: Vec::new(), working_dir: "/".to_string() };
    let spec = build_spec(cfg, &placeholder)?;
    spec.save(bundle.join("config.json"))
        .map_err(|e| internal("setup_isolation", e))?;
    Ok(())
}

/// §4.1 `apply_limits`: merge parsed memory/CPU quantities into the
/// bundle's `linux.resources` before the container is created.
pub fn apply_limits(container_id: &str, limits: &Limits) -> ServinResult<()> {
    let bundle = bundle_dir(container_id);
    let config_path = bundle.join("config.json");
    let mut spec = Spec::load(&config_path).map_err(|e| internal("apply_limits", e))?;

    let mut linux = spec.linux().clone().unwrap_or_else(|| LinuxBuilder::default().build().unwrap());

    let memory = limits.memory_bytes.map(|bytes| {
        LinuxMemoryBuilder::default().limit(bytes as i64).build().expect("memory resource builder")
    });
    let cpu = limits.cpu_weight.map(|weight| {
        // cgroup v2 cpu.weight is 1..=10000; map the 0..N CPU-share
        // convention onto that range, floored at 1.
        let shares = ((weight * 1024.0).round() as u64).max(1);
        LinuxCpuBuilder::default().shares(shares).build().expect("cpu resource builder")
    });

    if memory.is_some() || cpu.is_some() {
        let mut resources = LinuxResourcesBuilder::default();
        if let Some(memory) = memory {
            resources = resources.memory(memory);
        }
        if let Some(cpu) = cpu {
            resources = resources.cpu(cpu);
        }
        let resources = resources.build().map_err(|e| internal("apply_limits", e))?;
        linux.set_resources(Some(resources));
    }
    spec.set_linux(Some(linux));
    spec.save(&config_path).map_err(|e| internal("apply_limits", e))?;
    Ok(())
}

/// §4.1 `exec_entrypoint`: create and start the container's init
/// process via `libcontainer`, which performs the namespace setup,
/// `/proc`/`/sys`/`/dev` mounts, device-node creation, `pivot_root`
/// (falling back to `chroot` itself on failure), and cgroup
/// application the OCI bundle describes. Returns the host PID of the
/// new init process; from the Lifecycle Engine's perspective this is
/// the "fork, setup_isolation, apply_limits, exec" sequence of §4.5
/// collapsed into one call, since `libcontainer` owns that sequence
/// internally once handed a complete bundle.
pub fn exec_entrypoint(entrypoint: &Entrypoint) -> ServinResult<std::convert::Infallible> {
    // This primitive's signature matches §4.1 exactly ("replaces the
    // current process image"), but libcontainer's container-creation
    // API does not return `!` — see `run_container` below for the
    // entry point the Lifecycle Engine actually calls.
    let _ = entrypoint;
    Err(ServinError::Internal(
        "exec_entrypoint is superseded by platform::linux::run_container for the libcontainer path".into(),
    ))
}

/// The real Linux start path: finish the bundle (write the real
/// entrypoint into `process`), then create+start the container,
/// returning its init PID.
pub fn run_container(cfg: &IsolationConfig, entrypoint: &Entrypoint) -> ServinResult<i32> {
    let bundle = bundle_dir(&cfg.container_id);
    let mut spec = build_spec(cfg, entrypoint)?;
    // Re-apply any limits written by `apply_limits` onto the fresh spec
    // (build_spec always starts from a clean `Linux` block).
    if let Ok(existing) = Spec::load(bundle.join("config.json")) {
        if let Some(resources) = existing.linux().as_ref().and_then(|l| l.resources().clone()) {
            let mut linux = spec.linux().clone().unwrap();
            linux.set_resources(Some(resources));
            spec.set_linux(Some(linux));
        }
    }
    spec.save(bundle.join("config.json")).map_err(|e| internal("run_container", e))?;

    let state = state_dir(&cfg.container_id);
    fs::create_dir_all(&state)?;

    let container = ContainerBuilder::new(cfg.container_id.clone(), SyscallType::default())
        .with_root_path(state)
        .map_err(|e| internal("run_container", e))?
        .as_init(&bundle)
        .with_systemd(false)
        .build()
        .map_err(|e| internal("run_container", e))?;

    let pid = container.pid().ok_or_else(|| {
        ServinError::Internal(format!("container {} created without an init pid", cfg.container_id))
    })?;

    Ok(pid.as_raw())
}

/// §4.5 `exec`: join an already-running container's namespaces by
/// opening `/proc/<pid>/ns/*` and `setns`-ing into each, mirroring
/// `ContainerCommand::as_tenant()`'s join semantics but expressed
/// directly for the case where `servin` itself (not a libcontainer
/// tenant command) needs to enter the namespace set, e.g. for log
/// path resolution relative to the container's mount namespace.
pub fn join_namespaces(pid: u32) -> ServinResult<()> {
    use nix::sched::{CloneFlags, setns};
    use std::os::fd::AsFd;

    let kinds = [
        ("ipc", CloneFlags::CLONE_NEWIPC),
        ("uts", CloneFlags::CLONE_NEWUTS),
        ("net", CloneFlags::CLONE_NEWNET),
        ("pid", CloneFlags::CLONE_NEWPID),
        ("mnt", CloneFlags::CLONE_NEWNS),
    ];
    for (name, flag) in kinds {
        let path: PathBuf = Path::new("/proc").join(pid.to_string()).join("ns").join(name);
        let file = fs::File::open(&path)
            .map_err(|e| ServinError::Io(format!("opening {}: {e}", path.display())))?;
        setns(file.as_fd(), flag)
            .map_err(|e| internal("join_namespaces", format!("setns({name}) on pid {pid}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_and_cpu_resources_round_trip_through_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = IsolationConfig {
            container_id: format!("test-{}", rand::random::<u32>()),
            rootfs: dir.path().to_path_buf(),
            hostname: "servin".into(),
            user_namespace: false,
            mounts: vec![],
        };
        setup_isolation(&cfg).unwrap();
        apply_limits(&cfg.container_id, &Limits { memory_bytes: Some(128 * 1024 * 1024), cpu_weight: Some(0.5) }).unwrap();

        let spec = Spec::load(bundle_dir(&cfg.container_id).join("config.json")).unwrap();
        let resources = spec.linux().as_ref().unwrap().resources().clone().unwrap();
        assert_eq!(resources.memory().as_ref().unwrap().limit(), Some(128 * 1024 * 1024));
        assert_eq!(resources.cpu().as_ref().unwrap().shares(), Some(512));
    }
}
