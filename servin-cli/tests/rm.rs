use predicates::prelude::*;

mod common;

#[test]
fn test_rm_created() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("rm-created:latest");
    let name = "rm-created";

    ctx.cmd.args(["create", "--name", name, &image]).assert().success();

    ctx.new_cmd()
        .args(["rm", name])
        .assert()
        .success()
        .stdout(predicate::str::contains(name));
}

#[test]
fn test_rm_running_requires_force() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("rm-running:latest");
    let name = "rm-running";

    ctx.cmd.args(["create", "--name", name, &image, "--", "sleep", "300"]).assert().success();
    ctx.new_cmd().args(["start", name]).assert().success();

    ctx.new_cmd().args(["rm", name]).assert().failure();

    ctx.new_cmd()
        .args(["rm", "--force", name])
        .assert()
        .success()
        .stdout(predicate::str::contains(name));
}

#[test]
fn test_rm_unknown() {
    let mut ctx = common::servin();
    ctx.cmd
        .args(["rm", "no-such-container"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
