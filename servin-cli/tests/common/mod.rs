#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Every test gets its own `--home`, so containers created by one test
/// never interfere with another — there's no shared-daemon state to race.
static COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TestContext {
    pub cmd: Command,
    pub home: PathBuf,
}

impl TestContext {
    pub fn new_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_servin");
        let mut cmd = Command::new(bin_path);
        cmd.timeout(Duration::from_secs(30));
        cmd.arg("--home").arg(&self.home);
        cmd
    }

    pub fn cleanup(&self, name: &str) {
        let mut cmd = self.new_cmd();
        cmd.args(["rm", "--force", name]);
        let _ = cmd.ok();
    }

    /// Build a minimal `scratch` image and return its tag, for tests
    /// that only need *some* valid image reference to create against.
    pub fn build_scratch_image(&self, tag: &str) -> String {
        let dir = self.home.join("build-ctx");
        std::fs::create_dir_all(&dir).expect("create build context");
        let buildfile = dir.join("Buildfile");
        std::fs::write(&buildfile, "FROM scratch\nCMD true\n").expect("write buildfile");

        self.new_cmd()
            .args(["build", "--context", dir.to_str().unwrap(), "--tag", tag])
            .assert()
            .success();
        tag.to_string()
    }
}

pub fn servin() -> TestContext {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let home = std::env::temp_dir().join(format!("servin-cli-test-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&home).expect("create test home dir");

    let bin_path: &str = env!("CARGO_BIN_EXE_servin");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(30));
    cmd.arg("--home").arg(&home);

    TestContext { cmd, home }
}
