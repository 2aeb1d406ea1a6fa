use predicates::prelude::*;

mod common;

#[test]
fn test_stop_running() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("stop-running:latest");
    let name = "stop-running";

    ctx.cmd.args(["create", "--name", name, &image, "--", "sleep", "300"]).assert().success();
    ctx.new_cmd().args(["start", name]).assert().success();

    ctx.new_cmd()
        .args(["stop", name])
        .assert()
        .success()
        .stdout(predicate::str::contains(name));

    ctx.cleanup(name);
}

#[test]
fn test_stop_multiple_targets() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("stop-multi:latest");
    let a = "stop-multi-a";
    let b = "stop-multi-b";

    ctx.cmd.args(["create", "--name", a, &image, "--", "sleep", "300"]).assert().success();
    ctx.new_cmd().args(["create", "--name", b, &image, "--", "sleep", "300"]).assert().success();
    ctx.new_cmd().args(["start", a]).assert().success();
    ctx.new_cmd().args(["start", b]).assert().success();

    ctx.new_cmd()
        .args(["stop", a, b])
        .assert()
        .success()
        .stdout(predicate::str::contains(a))
        .stdout(predicate::str::contains(b));

    ctx.cleanup(a);
    ctx.cleanup(b);
}
