//! Advisory file locking (§4.3, §9).
//!
//! A generic non-blocking `flock(LOCK_EX)` guard. Used both for the
//! whole-runtime lock (one file under `<base>/.lock`) and for one lock
//! per `ContainerRecord` (`<base>/containers/<id>/.lock`), matching the
//! teacher's single whole-runtime-lock idiom generalized to per-record
//! granularity.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use servin_shared::{ServinError, ServinResult};

#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive, non-blocking lock on `path`, creating the
    /// file (and its parent directory) if necessary.
    pub fn acquire(path: &Path) -> ServinResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let fd = file.as_raw_fd();
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result != 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::WouldBlock {
                return Err(ServinError::InvalidState(format!(
                    "already locked: {}",
                    path.display()
                )));
            }
            return Err(ServinError::Io(format!(
                "failed to acquire lock {}: {}",
                path.display(),
                err
            )));
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_prevents_second_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.lock");
        let _first = FileLock::acquire(&path).unwrap();
        assert!(FileLock::acquire(&path).is_err());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.lock");
        {
            let _lock = FileLock::acquire(&path).unwrap();
        }
        assert!(FileLock::acquire(&path).is_ok());
    }
}
