use std::collections::HashMap;

use clap::Args;
use servin_core::{CreateSpec, ServinOptions, ServinRuntime};
use servin_shared::{ServinError, ServinResult};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Container name (generated if omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Image reference, e.g. `alpine:latest`
    pub image: String,

    /// Entrypoint override and its arguments
    pub command: Vec<String>,

    /// Environment variables, `KEY=VALUE`
    #[arg(short = 'e', long = "env")]
    pub env: Vec<String>,

    /// Port mappings, `[HOSTIP:]HOSTPORT:CONTAINERPORT[/udp]`
    #[arg(short = 'p', long = "publish")]
    pub ports: Vec<String>,

    /// Volume bindings, `SOURCE:TARGET[:ro]`
    #[arg(short = 'v', long = "volume")]
    pub volumes: Vec<String>,

    /// Working directory inside the container
    #[arg(short = 'w', long)]
    pub workdir: Option<String>,

    /// Container hostname
    #[arg(long)]
    pub hostname: Option<String>,

    /// Run as this user
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Memory limit, e.g. `256m`, `1g`
    #[arg(long)]
    pub memory: Option<String>,

    /// CPU weight/share, e.g. `0.5`
    #[arg(long)]
    pub cpus: Option<String>,

    /// Network to attach to
    #[arg(long, default_value_t = servin_shared::constants::network::BRIDGE_NAME.to_string())]
    pub network: String,

    /// Start immediately after creating
    #[arg(short = 'd', long)]
    pub detach: bool,
}

fn parse_env(entries: &[String]) -> ServinResult<Vec<(String, String)>> {
    entries
        .iter()
        .map(|e| {
            e.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| ServinError::Validation(format!("invalid -e value, expected KEY=VALUE: {e}")))
        })
        .collect()
}

fn parse_volumes(entries: &[String]) -> ServinResult<Vec<servin_core::store::VolumeBinding>> {
    entries
        .iter()
        .map(|e| {
            let parts: Vec<&str> = e.split(':').collect();
            match parts.as_slice() {
                [source, target] => {
                    Ok(servin_core::store::VolumeBinding { source: source.to_string(), target: target.to_string(), read_only: false })
                }
                [source, target, "ro"] => {
                    Ok(servin_core::store::VolumeBinding { source: source.to_string(), target: target.to_string(), read_only: true })
                }
                _ => Err(ServinError::Validation(format!("invalid -v value, expected SOURCE:TARGET[:ro]: {e}"))),
            }
        })
        .collect()
}

pub fn run(args: CreateArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;

    let (ports, bad_ports) = servin_shared::portspec::parse_all(args.ports.iter().map(String::as_str));
    for bad in &bad_ports {
        eprintln!("warning: ignoring malformed port spec: {bad}");
    }

    let name = args.name.unwrap_or_else(|| format!("servin-{}", &servin_shared::ContainerId::new().short()[..8]));
    let (command, rest) = args.command.split_first().map(|(c, r)| (Some(c.clone()), r.to_vec())).unwrap_or((None, Vec::new()));

    let spec = CreateSpec {
        name,
        image: args.image,
        command,
        args: rest,
        env: parse_env(&args.env)?,
        working_dir: args.workdir,
        hostname: args.hostname,
        user: args.user,
        memory: args.memory,
        cpus: args.cpus,
        network_mode: args.network,
        ports,
        volumes: parse_volumes(&args.volumes)?,
        labels: HashMap::new(),
    };

    let id = runtime.create(spec)?;
    if args.detach {
        runtime.start(id.as_str())?;
    }
    println!("{id}");
    Ok(())
}
