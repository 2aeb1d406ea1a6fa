use clap::Subcommand;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Subcommand, Debug)]
pub enum NetworkCommand {
    Create { name: String },
    Ls,
    Inspect { name: String },
    Rm { name: String },
}

pub fn run(cmd: NetworkCommand, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    match cmd {
        NetworkCommand::Create { name } => {
            runtime.networks().create(&name)?;
            println!("{name}");
        }
        NetworkCommand::Ls => {
            for record in runtime.networks().list()? {
                println!("{}", record.name);
            }
        }
        NetworkCommand::Inspect { name } => {
            let record = runtime.networks().inspect(&name)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        NetworkCommand::Rm { name } => {
            runtime.networks().remove(&name)?;
            println!("{name}");
        }
    }
    Ok(())
}
