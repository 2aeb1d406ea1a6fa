use clap::Args;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Name or ID of the container(s) to start
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

pub fn run(args: StartArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    super::run_over_targets(&args.targets, |target| runtime.start(target).map(|_| ()))
}
