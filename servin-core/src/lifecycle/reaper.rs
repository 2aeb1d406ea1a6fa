//! The single SIGCHLD-reaper thread (§9): one thread owns `waitpid`
//! for every child this process supervises, rather than each container
//! spawning its own wait loop. Exit events are posted to subscribers
//! over an `mpsc` channel the State Store's `update` closure consumes
//! to record `exit_code`/`finished_at`.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

#[derive(Debug, Clone)]
pub struct ExitEvent {
    pub pid: i32,
    pub exit_code: i32,
}

pub struct Reaper {
    subscribers: Arc<Mutex<Vec<Sender<ExitEvent>>>>,
}

impl Reaper {
    /// Spawn the reaper thread. It polls every supervised PID with
    /// `WNOHANG` at a short interval rather than blocking on
    /// `waitpid(-1, ...)`, since this process also has non-child
    /// threads that must not be disturbed by a blocking wait on
    /// unrelated signals.
    pub fn spawn() -> Self {
        let subscribers: Arc<Mutex<Vec<Sender<ExitEvent>>>> = Arc::new(Mutex::new(Vec::new()));
        let reaper_subscribers = subscribers.clone();
        std::thread::Builder::new()
            .name("servin-reaper".into())
            .spawn(move || {
                loop {
                    match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                        Ok(WaitStatus::Exited(pid, code)) => {
                            Self::broadcast(&reaper_subscribers, ExitEvent { pid: pid.as_raw(), exit_code: code });
                        }
                        Ok(WaitStatus::Signaled(pid, signal, _)) => {
                            Self::broadcast(
                                &reaper_subscribers,
                                ExitEvent { pid: pid.as_raw(), exit_code: 128 + signal as i32 },
                            );
                        }
                        Ok(WaitStatus::StillAlive) | Err(nix::errno::Errno::ECHILD) => {
                            std::thread::sleep(std::time::Duration::from_millis(200));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "reaper waitpid error");
                            std::thread::sleep(std::time::Duration::from_millis(200));
                        }
                    }
                }
            })
            .expect("failed to spawn reaper thread");
        Self { subscribers }
    }

    fn broadcast(subscribers: &Arc<Mutex<Vec<Sender<ExitEvent>>>>, event: ExitEvent) {
        let mut subs = subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscribe(&self) -> Receiver<ExitEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}
