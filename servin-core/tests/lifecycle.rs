//! Integration tests for lifecycle state transitions through the
//! facade (S3: stop transitions). `start` drives real namespace/cgroup
//! creation on Linux and needs `CAP_SYS_ADMIN`, so the full
//! create→start→stop round trip isn't exercised here (see
//! `servin_core::store`'s own inline tests for the transition table
//! itself) — these tests cover what `stop`/`remove` guarantee
//! regardless of host privilege: a container that never started can't
//! be `stop`ped into existence, and an unknown reference never panics.

use std::collections::HashMap;

use servin_core::lifecycle::CreateSpec;
use servin_core::runtime::{ServinOptions, ServinRuntime};
use servin_core::store::ContainerStatus;
use servin_core::vmm::ProviderKind;
use tempfile::TempDir;

fn open_test_runtime() -> (ServinRuntime, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let options = ServinOptions { base_dir: Some(dir.path().to_path_buf()), vm_provider: Some(ProviderKind::Development) };
    let runtime = ServinRuntime::open(options).expect("open runtime");
    (runtime, dir)
}

fn build_scratch_image(runtime: &ServinRuntime, context: &TempDir, tag: &str) -> String {
    let source = "FROM scratch\nCMD [\"/bin/app\"]\n";
    runtime.build_image(source, context.path(), &HashMap::new(), Some(tag)).unwrap().tag
}

fn make_spec(name: &str, image: &str) -> CreateSpec {
    CreateSpec {
        name: name.to_string(),
        image: image.to_string(),
        command: None,
        args: vec![],
        env: vec![],
        working_dir: None,
        hostname: None,
        user: None,
        memory: None,
        cpus: None,
        network_mode: "bridge".to_string(),
        ports: vec![],
        volumes: vec![],
        labels: HashMap::new(),
    }
}

/// S3: `stop` is only a valid transition out of `Running` — a
/// container that was only ever `create`d can't be `stop`ped.
#[test]
fn stop_on_a_never_started_container_is_rejected() {
    let (runtime, _home) = open_test_runtime();
    let context = TempDir::new().unwrap();
    let tag = build_scratch_image(&runtime, &context, "s3a:latest");

    runtime.create(make_spec("idle", &tag)).unwrap();
    assert_eq!(runtime.get("idle").unwrap().status, ContainerStatus::Created);
    assert!(runtime.stop("idle").is_err());
    assert_eq!(runtime.get("idle").unwrap().status, ContainerStatus::Created);
}

/// Operating on a reference that resolves to nothing returns a
/// `NotFound`-flavored error rather than panicking.
#[test]
fn operations_on_an_unknown_reference_fail_cleanly() {
    let (runtime, _home) = open_test_runtime();
    assert!(runtime.get("does-not-exist").is_err());
    assert!(runtime.stop("does-not-exist").is_err());
    assert!(runtime.remove("does-not-exist", false).is_err());
}

/// `remove` on a `Created` container (never started, so no process to
/// stop) tears it down directly without requiring `force`.
#[test]
fn remove_tears_down_a_created_container_without_force() {
    let (runtime, _home) = open_test_runtime();
    let context = TempDir::new().unwrap();
    let tag = build_scratch_image(&runtime, &context, "s3b:latest");

    runtime.create(make_spec("throwaway", &tag)).unwrap();
    runtime.remove("throwaway", false).unwrap();
    assert!(runtime.get("throwaway").is_err());
    assert!(runtime.list().is_empty());
}
