//! Container Lifecycle Engine (§4.5): `create`/`start`/`stop`/`remove`/
//! `exec`/`logs`, the component every other module exists to support.
//!
//! On Linux, `start` drives the container straight through
//! [`crate::platform`]'s `libcontainer`-backed primitives. Elsewhere,
//! `start` relays through the [`crate::dispatcher`]/[`crate::orchestrator`]
//! VM path instead (§4.2/§4.8) — the engine itself never branches on
//! host OS beyond that one dispatch decision (§9).

mod logs;
mod reaper;

pub use logs::{LogLine, Stream};
pub use reaper::ExitEvent;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use servin_shared::layout::ServinLayout;
use servin_shared::{ContainerId, PortMapping, ServinError, ServinResult};

use crate::dispatcher::{self, CreateArgs, Route};
use crate::images::{ImageRecord, ImageStore, Layer};
use crate::orchestrator::VmOrchestrator;
use crate::platform::{self, BindMount, Entrypoint, IsolationConfig, Limits};
use crate::store::{ContainerRecord, ContainerStatus, ResourceLimits, StateStore, VolumeBinding};

const GRACEFUL_STOP_TIMEOUT_SECS: u64 = 10;

/// Everything a caller supplies to `create` (§4.5); fields left `None`
/// or empty fall back to the resolved image's own defaults.
pub struct CreateSpec {
    pub name: String,
    pub image: String,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<String>,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub memory: Option<String>,
    pub cpus: Option<String>,
    pub network_mode: String,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeBinding>,
    pub labels: HashMap<String, String>,
}

pub struct LifecycleEngine {
    store: Arc<StateStore>,
    images: ImageStore,
    layout: ServinLayout,
    reaper: reaper::Reaper,
    vm: Option<Arc<VmOrchestrator>>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<StateStore>, images: ImageStore, layout: ServinLayout, vm: Option<Arc<VmOrchestrator>>) -> Self {
        Self { store, images, layout, reaper: reaper::Reaper::spawn(), vm }
    }

    /// `create` (§4.5): resolve the image, materialize its layers into
    /// the container's own rootfs directory, and persist a `Created`
    /// record.
    pub fn create(&self, spec: CreateSpec) -> ServinResult<ContainerId> {
        let image = self.images.get(&spec.image)?;
        let id = self.store.fresh_id();
        let rootfs_path = self.layout.container_rootfs_dir(id.as_str());

        materialize_rootfs(&self.layout.images_dir(), &image, &rootfs_path)?;

        // Effective default command line is `entrypoint` followed by `cmd`
        // (§4.4), each independently overridable by the caller.
        let default_argv: Vec<String> =
            image.config.entrypoint.iter().chain(image.config.cmd.iter()).cloned().collect();
        let command = spec
            .command
            .unwrap_or_else(|| default_argv.first().cloned().unwrap_or_else(|| "/bin/sh".to_string()));
        let args = if spec.args.is_empty() {
            default_argv.iter().skip(1).cloned().collect()
        } else {
            spec.args
        };
        let base_env: Vec<(String, String)> = image
            .config
            .env
            .iter()
            .filter_map(|kv| kv.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
            .collect();
        let env = platform::merge_env(&base_env, &spec.env);

        let record = ContainerRecord {
            id: id.clone(),
            name: spec.name,
            image: image.tag.clone(),
            command,
            args,
            env,
            working_dir: spec.working_dir.unwrap_or_else(|| image.config.working_dir.clone()),
            hostname: spec.hostname.unwrap_or_else(|| servin_shared::constants::container::DEFAULT_HOSTNAME.to_string()),
            user: spec.user.or_else(|| image.config.user.clone()),
            limits: ResourceLimits {
                memory_bytes: spec.memory.as_deref().and_then(platform::parse_memory_quantity),
                cpu_weight: spec.cpus.as_deref().and_then(platform::parse_cpu_quantity),
            },
            network_mode: spec.network_mode,
            ports: spec.ports,
            volumes: spec.volumes,
            status: ContainerStatus::Created,
            pid: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            exit_code: None,
            rootfs_path,
            labels: spec.labels,
        };

        self.store.create(record)?;
        Ok(id)
    }

    /// `start` (§4.5): native fork+isolate+exec on Linux, VM relay
    /// everywhere else.
    pub fn start(&self, reference: &str) -> ServinResult<ContainerId> {
        let id = self.store.resolve(reference)?;
        let record = self.store.get(reference)?;

        match dispatcher::route() {
            Route::Native => self.start_native(&id, &record),
            Route::Vm => self.start_in_vm(&id, &record),
        }
    }

    fn start_native(&self, id: &ContainerId, record: &ContainerRecord) -> ServinResult<ContainerId> {
        let mounts = record
            .volumes
            .iter()
            .map(|v| BindMount { source: PathBuf::from(&v.source), destination: v.target.clone(), read_only: v.read_only })
            .collect();
        let cfg = IsolationConfig {
            container_id: id.to_string(),
            rootfs: record.rootfs_path.clone(),
            hostname: record.hostname.clone(),
            user_namespace: false,
            mounts,
        };
        platform::setup_isolation(&cfg)?;
        platform::apply_limits(
            &cfg.container_id,
            &Limits { memory_bytes: record.limits.memory_bytes, cpu_weight: record.limits.cpu_weight },
        )?;

        let mut argv = vec![record.command.clone()];
        argv.extend(record.args.iter().cloned());
        let entrypoint = Entrypoint { argv, env: record.env.clone(), working_dir: record.working_dir.clone() };

        let pid = platform::run_native_container(&cfg, &entrypoint)?;

        let store = self.store.clone();
        let id_for_waiter = id.clone();
        let rx = self.reaper.subscribe();
        std::thread::Builder::new()
            .name(format!("servin-wait-{}", id_for_waiter.short()))
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    if event.pid != pid {
                        continue;
                    }
                    // §3/§8 property 3: every status change goes through
                    // `transition()`'s table check, not a raw field write.
                    if store.transition(&id_for_waiter, ContainerStatus::Exited).is_ok() {
                        let _ = store.update(&id_for_waiter, |r| {
                            r.exit_code = Some(event.exit_code);
                            r.finished_at = Some(Utc::now());
                            Ok(())
                        });
                    }
                    break;
                }
            })
            .expect("failed to spawn exit-wait thread");

        self.store.update(id, |r| {
            r.pid = Some(pid as u32);
            r.started_at = Some(Utc::now());
            Ok(())
        })?;
        self.store.transition(id, ContainerStatus::Running)?;
        Ok(id.clone())
    }

    fn start_in_vm(&self, id: &ContainerId, record: &ContainerRecord) -> ServinResult<ContainerId> {
        let orchestrator = self.vm.as_ref().ok_or_else(|| {
            ServinError::ProviderUnavailable("no VM orchestrator configured for the non-native start path".into())
        })?;
        let volumes: Vec<(String, String, bool)> =
            record.volumes.iter().map(|v| (v.source.clone(), v.target.clone(), v.read_only)).collect();
        let create = CreateArgs {
            name: &record.name,
            image: &record.image,
            env: &record.env,
            ports: &record.ports,
            volumes: &volumes,
            working_dir: &record.working_dir,
            detach: true,
            command: record.command.as_str(),
            args: &record.args,
        };
        let _guest_id = dispatcher::create_in_vm(orchestrator, &create)?;
        self.store.transition(id, ContainerStatus::Running)?;
        Ok(id.clone())
    }

    /// `stop` (§4.5): SIGTERM, wait up to the grace period, escalate to
    /// SIGKILL.
    pub fn stop(&self, reference: &str) -> ServinResult<()> {
        let id = self.store.resolve(reference)?;
        let record = self.store.get(reference)?;

        if let Some(pid) = record.pid {
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
            let deadline = std::time::Instant::now() + std::time::Duration::from_secs(GRACEFUL_STOP_TIMEOUT_SECS);
            while std::time::Instant::now() < deadline && crate::util::is_process_alive(pid) {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            if crate::util::is_process_alive(pid) {
                crate::util::kill_process(pid);
            }
        } else if let Some(orchestrator) = &self.vm {
            let _ = orchestrator.stop_container(dispatcher::DEFAULT_VM_ID, record.name.as_str());
        }

        self.store.transition(&id, ContainerStatus::Stopped)?;
        self.store.update(&id, |r| {
            r.finished_at = Some(Utc::now());
            if r.exit_code.is_none() {
                r.exit_code = Some(143);
            }
            Ok(())
        })?;
        Ok(())
    }

    /// `remove` (§4.5): refuses a Running container unless `force`.
    pub fn remove(&self, reference: &str, force: bool) -> ServinResult<()> {
        let id = self.store.resolve(reference)?;
        let record = self.store.get(reference)?;
        if record.status == ContainerStatus::Running {
            if !force {
                return Err(ServinError::InvalidState(format!(
                    "container {reference} is running; stop it first or use force"
                )));
            }
            self.stop(reference)?;
        }
        self.store.transition(&id, ContainerStatus::Removed)?;
        self.store.delete(&id)
    }

    /// `exec` (§4.5): join the running container's namespaces on
    /// Linux, relay through the VM otherwise.
    pub fn exec(&self, reference: &str, argv: &[String]) -> ServinResult<crate::vmm::GuestExecOutput> {
        let record = self.store.get(reference)?;
        if record.status != ContainerStatus::Running {
            return Err(ServinError::InvalidState(format!("container {reference} is not running")));
        }

        match dispatcher::route() {
            Route::Native => {
                let pid = record.pid.ok_or_else(|| ServinError::Internal("running container has no pid".into()))?;
                platform::join_namespaces(pid)?;
                run_argv_in_current_namespaces(argv)
            }
            Route::Vm => {
                let orchestrator =
                    self.vm.as_ref().ok_or_else(|| ServinError::ProviderUnavailable("no VM orchestrator configured".into()))?;
                orchestrator.run_container(dispatcher::DEFAULT_VM_ID, argv)
            }
        }
    }

    /// `logs` (§4.5): interleaved stdout/stderr, optionally tailed and
    /// time-bounded.
    pub fn logs(
        &self,
        reference: &str,
        tail: Option<usize>,
        since: Option<chrono::DateTime<Utc>>,
        until: Option<chrono::DateTime<Utc>>,
    ) -> ServinResult<Vec<LogLine>> {
        let record = self.store.get(reference)?;
        let stdout_path = self.layout.stdout_log_path(record.id.as_str());
        let stderr_path = self.layout.stderr_log_path(record.id.as_str());
        Ok(logs::read_interleaved(&stdout_path, &stderr_path, tail, since, until))
    }
}

fn run_argv_in_current_namespaces(argv: &[String]) -> ServinResult<crate::vmm::GuestExecOutput> {
    let (program, rest) = argv.split_first().ok_or_else(|| ServinError::Validation("empty exec command".into()))?;
    let output = std::process::Command::new(program)
        .args(rest)
        .output()
        .map_err(|e| ServinError::internal("exec", e))?;
    Ok(crate::vmm::GuestExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Realize an image's layer list into a fresh container rootfs
/// directory (§4.4/§4.5). `servin` has no overlay/union-mount story
/// (out of scope per the buildfile module's design), so each container
/// gets its own independent copy:
///
/// - `Scratch` contributes nothing (an empty directory).
/// - `Imported` copies the tarball-extracted rootfs recorded under the
///   image's own directory.
/// - `Copy` copies files from the original build context, recorded in
///   the image's `build_metadata["context"]`; if that context no
///   longer exists on disk the layer is skipped with a warning rather
///   than failing the whole container (the context is scratch space,
///   not meant to outlive the build).
/// - `Run` is metadata-only and has no rootfs effect, matching the
///   buildfile interpreter's own treatment of `RUN`.
fn materialize_rootfs(images_dir: &Path, image: &ImageRecord, dest: &Path) -> ServinResult<()> {
    std::fs::create_dir_all(dest)?;
    for layer in &image.layers {
        match layer {
            Layer::Scratch | Layer::Run { .. } => {}
            Layer::Imported { .. } => {
                let source = images_dir.join(image.id.as_str()).join("rootfs");
                copy_tree(&source, dest)?;
            }
            Layer::Copy { sources, dest: dest_rel } => {
                let Some(context) = image.build_metadata.get("context").map(PathBuf::from) else {
                    tracing::warn!(image = %image.id, "COPY layer with no recorded build context, skipping");
                    continue;
                };
                if !context.is_dir() {
                    tracing::warn!(context = %context.display(), "build context no longer exists, skipping COPY layer");
                    continue;
                }
                let target_root = dest.join(dest_rel.trim_start_matches('/'));
                for src in sources {
                    let source_path = context.join(src);
                    if source_path.is_dir() {
                        std::fs::create_dir_all(&target_root)?;
                        copy_tree(&source_path, &target_root)?;
                    } else if source_path.is_file() {
                        std::fs::create_dir_all(&target_root)?;
                        let file_name = source_path.file_name().ok_or_else(|| {
                            ServinError::Validation(format!("invalid COPY source: {src}"))
                        })?;
                        std::fs::copy(&source_path, target_root.join(file_name))?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> ServinResult<()> {
    if !source.is_dir() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(source) {
        let entry = entry.map_err(|e| ServinError::internal("copy_tree", e))?;
        let relative = entry.path().strip_prefix(source).unwrap();
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
