use predicates::prelude::*;

mod common;

#[test]
fn test_create_basic() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("create-basic:latest");

    ctx.cmd
        .arg("create")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]{32}\n$").unwrap());
}

#[test]
fn test_create_named_conflict() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("create-named:latest");
    let name = "create-named";

    ctx.cmd.args(["create", "--name", name, &image]).assert().success();

    ctx.new_cmd()
        .args(["create", "--name", name, &image])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ctx.cleanup(name);
}

#[test]
fn test_create_resources() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("create-resources:latest");
    let name = "create-resources";

    ctx.cmd
        .args([
            "create", "--name", name, "--cpus", "0.5", "--memory", "128m", "--env", "TEST_VAR=1", "--workdir", "/tmp",
            &image,
        ])
        .assert()
        .success();

    ctx.cleanup(name);
}

#[test]
fn test_create_unknown_image_fails() {
    let mut ctx = common::servin();
    ctx.cmd
        .args(["create", "--name", "create-unknown", "no-such-image:latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
