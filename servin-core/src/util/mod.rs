//! Small cross-cutting helpers: process liveness, logging init.

pub mod process;

pub use process::{is_process_alive, kill_process, read_pid_file};

use servin_shared::ServinResult;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a `tracing` subscriber reading its filter from `RUST_LOG`
/// (default `info`), writing to stderr so stdout stays free for
/// data-plane output (`list`, `logs`, ...). Safe to call more than
/// once; only the first call takes effect.
pub fn init_logging() -> ServinResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    Ok(())
}
