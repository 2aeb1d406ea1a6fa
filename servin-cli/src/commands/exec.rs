use clap::Args;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Name or ID of the running container
    pub target: String,

    /// Command and arguments to run inside the container
    #[arg(required = true, num_args = 1..)]
    pub command: Vec<String>,
}

pub fn run(args: ExecArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    let output = runtime.exec(&args.target, &args.command)?;
    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
    if output.exit_code != 0 {
        std::process::exit(output.exit_code);
    }
    Ok(())
}
