//! `servin`: the command-line entry point over [`servin_core::runtime::ServinRuntime`].

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// A cross-platform container runtime: native isolation on Linux, a
/// transparent VM fallback on macOS/Windows.
#[derive(Parser, Debug)]
#[command(name = "servin", version, about)]
struct Cli {
    /// Override the runtime's base directory (defaults to `SERVIN_BASE_DIR`,
    /// then `~/.servin`).
    #[arg(long, global = true, env = "SERVIN_BASE_DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Also invocable as `run` — the guest-side invocation shape the
    /// Dispatcher builds when relaying a container operation into a VM.
    #[command(alias = "run")]
    Create(commands::create::CreateArgs),
    Start(commands::start::StartArgs),
    Stop(commands::stop::StopArgs),
    Rm(commands::rm::RmArgs),
    #[command(alias = "ps")]
    List(commands::list::ListArgs),
    Logs(commands::logs::LogsArgs),
    Exec(commands::exec::ExecArgs),
    Build(commands::build::BuildArgs),
    #[command(subcommand)]
    Volume(commands::volume::VolumeCommand),
    #[command(subcommand)]
    Network(commands::network::NetworkCommand),
}

fn main() {
    let _ = servin_core::util::init_logging();
    let cli = Cli::parse();

    let options = servin_core::ServinOptions { base_dir: cli.home, vm_provider: None };

    let result = match cli.command {
        Command::Create(args) => commands::create::run(args, options),
        Command::Start(args) => commands::start::run(args, options),
        Command::Stop(args) => commands::stop::run(args, options),
        Command::Rm(args) => commands::rm::run(args, options),
        Command::List(args) => commands::list::run(args, options),
        Command::Logs(args) => commands::logs::run(args, options),
        Command::Exec(args) => commands::exec::run(args, options),
        Command::Build(args) => commands::build::run(args, options),
        Command::Volume(cmd) => commands::volume::run(cmd, options),
        Command::Network(cmd) => commands::network::run(cmd, options),
    };

    if let Err(e) = result {
        eprintln!("servin: {e}");
        std::process::exit(e.exit_code());
    }
}
