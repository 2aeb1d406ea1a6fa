use predicates::prelude::*;

mod common;

#[test]
fn test_list_header() {
    let mut ctx = common::servin();
    ctx.cmd
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("CONTAINER ID"))
        .stdout(predicate::str::contains("IMAGE"))
        .stdout(predicate::str::contains("STATUS"));
}

#[test]
fn test_list_hides_unstarted_without_all() {
    let mut ctx = common::servin();
    let image = ctx.build_scratch_image("list-lifecycle:latest");
    let name = "list-lifecycle";

    ctx.cmd.args(["create", "--name", name, &image]).assert().success();

    ctx.new_cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(name).not());

    ctx.new_cmd()
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains(name))
        .stdout(predicate::str::contains("Created"));

    ctx.cleanup(name);
}

#[test]
fn test_list_alias_ps() {
    let mut ctx = common::servin();
    ctx.cmd.arg("ps").assert().success();
}
