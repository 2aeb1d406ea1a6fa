use clap::Args;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Name or ID of the container(s) to stop
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

pub fn run(args: StopArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    super::run_over_targets(&args.targets, |target| runtime.stop(target))
}
