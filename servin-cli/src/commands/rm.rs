use clap::Args;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Force removal of a running container
    #[arg(short, long)]
    pub force: bool,

    /// Name or ID of the container(s) to remove
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

pub fn run(args: RmArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    super::run_over_targets(&args.targets, |target| runtime.remove(target, args.force))
}
