use std::collections::HashMap;

use clap::Subcommand;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Subcommand, Debug)]
pub enum VolumeCommand {
    Create { name: String },
    Ls,
    Inspect { name: String },
    Rm {
        name: String,
        #[arg(short, long)]
        force: bool,
    },
    Prune,
}

pub fn run(cmd: VolumeCommand, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    match cmd {
        VolumeCommand::Create { name } => {
            runtime.volumes().create(&name, HashMap::new())?;
            println!("{name}");
        }
        VolumeCommand::Ls => {
            for record in runtime.volumes().list()? {
                println!("{}", record.name);
            }
        }
        VolumeCommand::Inspect { name } => {
            let record = runtime.volumes().inspect(&name)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        VolumeCommand::Rm { name, force } => {
            runtime.remove_volume(&name, force)?;
            println!("{name}");
        }
        VolumeCommand::Prune => {
            for name in runtime.prune_volumes()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}
