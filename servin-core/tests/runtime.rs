//! Integration tests for the external facade (`ServinRuntime`), end to
//! end against a temporary base directory: buildfile → create → list,
//! the way `servin-cli` itself drives the core.

use std::collections::HashMap;

use servin_core::lifecycle::CreateSpec;
use servin_core::runtime::{ServinOptions, ServinRuntime};
use servin_core::vmm::ProviderKind;
use tempfile::TempDir;

fn open_test_runtime() -> (ServinRuntime, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let options = ServinOptions { base_dir: Some(dir.path().to_path_buf()), vm_provider: Some(ProviderKind::Development) };
    let runtime = ServinRuntime::open(options).expect("open runtime");
    (runtime, dir)
}

fn build_scratch_image(runtime: &ServinRuntime, context: &TempDir, tag: &str) -> String {
    let source = "FROM scratch\nENV APP=hello\nCMD [\"/bin/app\"]\n";
    let image = runtime
        .build_image(source, context.path(), &HashMap::new(), Some(tag))
        .expect("buildfile should succeed");
    image.tag
}

/// S1: a minimal buildfile produces an image with the env/cmd/layers the
/// scenario specifies, reachable through the facade rather than the
/// interpreter directly.
#[test]
fn s1_buildfile_minimal_image_through_facade() {
    let (runtime, _home) = open_test_runtime();
    let context = TempDir::new().unwrap();
    let tag = build_scratch_image(&runtime, &context, "hello:latest");

    let image = runtime.images().get(&tag).unwrap();
    assert_eq!(image.config.env, vec!["APP=hello".to_string()]);
    assert_eq!(image.config.cmd, vec!["/bin/app".to_string()]);
    assert_eq!(image.tag, "hello:latest");
}

/// S2: create a container from that image, then list it — exactly one
/// entry, Created status, 12-char short ID, resolved command.
#[test]
fn s2_run_and_list() {
    let (runtime, _home) = open_test_runtime();
    let context = TempDir::new().unwrap();
    let tag = build_scratch_image(&runtime, &context, "s2:latest");

    let spec = CreateSpec {
        name: "web".to_string(),
        image: tag,
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
    };
    runtime.create(spec).expect("create should succeed");

    let containers = runtime.list();
    assert_eq!(containers.len(), 1);
    let record = &containers[0];
    assert_eq!(record.name, "web");
    assert_eq!(record.status, servin_core::store::ContainerStatus::Created);
    assert_eq!(record.id.short().len(), 12);
    assert_eq!(record.command, "/bin/app");
}

/// §8 property 1: two `create`s with the same name are rejected — at
/// most one non-removed record ever carries a given name.
#[test]
fn name_uniqueness_enforced_through_facade() {
    let (runtime, _home) = open_test_runtime();
    let context = TempDir::new().unwrap();
    let tag = build_scratch_image(&runtime, &context, "dup:latest");

    let make_spec = |name: &str| CreateSpec {
        name: name.to_string(),
        image: tag.clone(),
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
    };

    runtime.create(make_spec("dup-name")).unwrap();
    assert!(runtime.create(make_spec("dup-name")).is_err());
}

/// A fresh base directory starts with no containers and the default
/// `servin0` bridge network already present.
#[test]
fn fresh_runtime_has_no_containers_and_the_default_network() {
    let (runtime, _home) = open_test_runtime();
    assert!(runtime.list().is_empty());
    assert!(runtime.networks().inspect(servin_core::net::DEFAULT_BRIDGE).is_ok());
}

/// Re-opening the same base directory reconstructs the same container
/// list from disk (§4.3 index rebuild).
#[test]
fn reopening_the_runtime_reloads_containers_from_disk() {
    let dir = TempDir::new().unwrap();
    let context = TempDir::new().unwrap();
    let name;
    {
        let options = ServinOptions { base_dir: Some(dir.path().to_path_buf()), vm_provider: Some(ProviderKind::Development) };
        let runtime = ServinRuntime::open(options).unwrap();
        let tag = build_scratch_image(&runtime, &context, "reopen:latest");
        let spec = CreateSpec {
            name: "persisted".to_string(),
            image: tag,
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
        };
        runtime.create(spec).unwrap();
        name = "persisted".to_string();
    }

    let options = ServinOptions { base_dir: Some(dir.path().to_path_buf()), vm_provider: Some(ProviderKind::Development) };
    let runtime = ServinRuntime::open(options).unwrap();
    let containers = runtime.list();
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].name, name);
}
