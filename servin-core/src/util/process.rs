//! Process liveness helpers used by the State Store's startup
//! reconciliation pass and by the Lifecycle Engine's stop path.

use servin_shared::{ServinError, ServinResult};
use std::path::Path;

/// Read a PID from a file, trimming whitespace.
pub fn read_pid_file(path: &Path) -> ServinResult<u32> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ServinError::Io(format!("failed to read PID file {}: {}", path.display(), e)))?;

    content.trim().parse::<u32>().map_err(|e| {
        ServinError::Io(format!(
            "invalid PID in file {}: '{}' - {}",
            path.display(),
            content.trim(),
            e
        ))
    })
}

/// Send SIGKILL. Returns `true` if the process was killed or was
/// already gone.
pub fn kill_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGKILL) == 0 || !is_process_alive(pid) }
}

/// `kill(pid, 0)` existence check; sends no signal.
pub fn is_process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn implausible_pid_is_not_alive() {
        assert!(!is_process_alive(999999999));
    }

    #[test]
    fn read_pid_file_trims_newline() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "12345").unwrap();
        assert_eq!(read_pid_file(file.path()).unwrap(), 12345);
    }

    #[test]
    fn read_pid_file_rejects_garbage() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not-a-pid").unwrap();
        assert!(read_pid_file(file.path()).is_err());
    }
}
