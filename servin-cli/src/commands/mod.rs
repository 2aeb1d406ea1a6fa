pub mod build;
pub mod create;
pub mod exec;
pub mod list;
pub mod logs;
pub mod network;
pub mod rm;
pub mod start;
pub mod stop;
pub mod volume;

use servin_shared::ServinResult;

/// Multi-target commands (`start`/`stop`/`rm`) apply `op` to each target,
/// print the target name on success, and report a combined error once
/// everything has run rather than aborting at the first failure —
/// matching the teacher's batch-command CLI texture.
pub fn run_over_targets(targets: &[String], mut op: impl FnMut(&str) -> ServinResult<()>) -> ServinResult<()> {
    let mut errors = Vec::new();
    for target in targets {
        match op(target) {
            Ok(()) => println!("{target}"),
            Err(e) => {
                eprintln!("Error: {target}: {e}");
                errors.push(format!("{target}: {e}"));
            }
        }
    }
    if !errors.is_empty() {
        return Err(servin_shared::ServinError::Internal(format!(
            "{} of {} target(s) failed: {}",
            errors.len(),
            targets.len(),
            errors.join("; ")
        )));
    }
    Ok(())
}
