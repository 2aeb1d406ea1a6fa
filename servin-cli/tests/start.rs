use predicates::prelude::*;

mod common;

#[test]
fn test_start_created() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("start-created:latest");
    let name = "start-created";

    ctx.cmd.args(["create", "--name", name, &image]).assert().success();

    ctx.new_cmd()
        .args(["start", name])
        .assert()
        .success()
        .stdout(predicate::str::contains(name));

    ctx.cleanup(name);
}

#[test]
fn test_start_unknown() {
    let mut ctx = common::servin();
    ctx.cmd
        .args(["start", "no-such-container"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
