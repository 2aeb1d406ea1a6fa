use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::{ServinError, ServinResult};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build context directory
    #[arg(short = 'c', long, default_value = ".")]
    pub context: PathBuf,

    /// Path to the buildfile, relative to the context unless absolute
    #[arg(short = 'f', long, default_value = "Buildfile")]
    pub file: PathBuf,

    /// Tag to apply to the resulting image, `name:tag`
    #[arg(short = 't', long)]
    pub tag: Option<String>,

    /// Build-time arguments, `KEY=VALUE`
    #[arg(long = "build-arg")]
    pub build_args: Vec<String>,
}

pub fn run(args: BuildArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;

    let buildfile_path = if args.file.is_absolute() { args.file.clone() } else { args.context.join(&args.file) };
    let source = std::fs::read_to_string(&buildfile_path)
        .map_err(|e| ServinError::Validation(format!("reading buildfile {}: {e}", buildfile_path.display())))?;

    let mut build_args = HashMap::new();
    for entry in &args.build_args {
        let (k, v) = entry
            .split_once('=')
            .ok_or_else(|| ServinError::Validation(format!("invalid --build-arg, expected KEY=VALUE: {entry}")))?;
        build_args.insert(k.to_string(), v.to_string());
    }

    let record = runtime.build_image(&source, &args.context, &build_args, args.tag.as_deref())?;
    println!("{}", record.id);
    Ok(())
}
