//! SSH/SCP plumbing shared by every provider that talks to its guest
//! over a forwarded SSH port (§4.7.3 readiness probing, §4.6
//! `run_container`/`copy_to_vm`/`copy_from_vm`). Binaries are located
//! with `which` rather than assumed to be on `PATH` at a fixed spot,
//! matching the teacher's habit of resolving external tools instead of
//! hardcoding paths.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use servin_shared::constants::vm;
use servin_shared::{ServinError, ServinResult};

use super::GuestExecOutput;

fn ssh_binary() -> ServinResult<std::path::PathBuf> {
    which::which("ssh").map_err(|e| ServinError::ProviderUnavailable(format!("ssh not found on PATH: {e}")))
}

fn scp_binary() -> ServinResult<std::path::PathBuf> {
    which::which("scp").map_err(|e| ServinError::ProviderUnavailable(format!("scp not found on PATH: {e}")))
}

fn sshpass_binary() -> Option<std::path::PathBuf> {
    which::which("sshpass").ok()
}

/// Build the base ssh/scp argument prefix: disable host-key checking
/// (guest images are ephemeral and regenerated per VM) and wrap with
/// `sshpass` when available since the guest image authenticates
/// password-only (§4.7 `GUEST_ROOT_PASSWORD`).
fn wrap_with_password(mut cmd: Command) -> Command {
    if let Some(sshpass) = sshpass_binary() {
        let mut wrapped = Command::new(sshpass);
        wrapped.arg("-p").arg(vm::GUEST_ROOT_PASSWORD);
        let program = cmd.get_program().to_owned();
        wrapped.arg(program);
        wrapped.args(cmd.get_args());
        cmd = wrapped;
    }
    cmd
}

/// One readiness probe (§4.7.3): true once the guest accepts the SSH
/// connection and runs a trivial command successfully.
pub fn probe_ready(ssh_port: u16) -> bool {
    run(ssh_port, "true").map(|out| out.exit_code == 0).unwrap_or(false)
}

/// Poll [`probe_ready`] at `SSH_READY_POLL_INTERVAL_SECS` until
/// `SSH_READY_TIMEOUT_SECS` elapses (§4.7.3).
pub fn wait_until_ready(ssh_port: u16) -> ServinResult<()> {
    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(vm::SSH_READY_TIMEOUT_SECS);
    let interval = Duration::from_secs(vm::SSH_READY_POLL_INTERVAL_SECS);
    while start.elapsed() < timeout {
        if probe_ready(ssh_port) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
    Err(ServinError::Timeout(format!(
        "guest did not become SSH-ready on port {ssh_port} within {}s",
        vm::SSH_READY_TIMEOUT_SECS
    )))
}

pub fn run(ssh_port: u16, remote_command: &str) -> ServinResult<GuestExecOutput> {
    let ssh = ssh_binary()?;
    let mut cmd = Command::new(ssh);
    cmd.args([
        "-p",
        &ssh_port.to_string(),
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
        "-o",
        "ConnectTimeout=5",
        &format!("{}@127.0.0.1", vm::GUEST_USER),
        remote_command,
    ]);
    let cmd = wrap_with_password(cmd);
    let output = run_and_capture(cmd)?;
    Ok(output)
}

pub fn run_argv(ssh_port: u16, argv: &[String]) -> ServinResult<GuestExecOutput> {
    let joined = argv
        .iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ");
    run(ssh_port, &format!("{} {}", vm::GUEST_BINARY_PATH, joined))
}

fn shell_quote(arg: &str) -> String {
    if arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=".contains(c)) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

pub fn copy_to_vm(ssh_port: u16, local: &Path, remote: &str) -> ServinResult<()> {
    let scp = scp_binary()?;
    let mut cmd = Command::new(scp);
    cmd.args([
        "-P",
        &ssh_port.to_string(),
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
    ]);
    cmd.arg(local);
    cmd.arg(format!("{}@127.0.0.1:{remote}", vm::GUEST_USER));
    let cmd = wrap_with_password(cmd);
    let out = run_and_capture(cmd)?;
    if out.exit_code != 0 {
        return Err(ServinError::internal("copy_to_vm", out.stderr));
    }
    Ok(())
}

pub fn copy_from_vm(ssh_port: u16, remote: &str, local: &Path) -> ServinResult<()> {
    let scp = scp_binary()?;
    let mut cmd = Command::new(scp);
    cmd.args([
        "-P",
        &ssh_port.to_string(),
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
    ]);
    cmd.arg(format!("{}@127.0.0.1:{remote}", vm::GUEST_USER));
    cmd.arg(local);
    let cmd = wrap_with_password(cmd);
    let out = run_and_capture(cmd)?;
    if out.exit_code != 0 {
        return Err(ServinError::internal("copy_from_vm", out.stderr));
    }
    Ok(())
}

fn run_and_capture(mut cmd: Command) -> ServinResult<GuestExecOutput> {
    let output = cmd
        .output()
        .map_err(|e| ServinError::internal("ssh_exec", e))?;
    Ok(GuestExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_passes_plain_argv_through() {
        assert_eq!(shell_quote("alpine:latest"), "alpine:latest");
        assert_eq!(shell_quote("--name"), "--name");
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}
