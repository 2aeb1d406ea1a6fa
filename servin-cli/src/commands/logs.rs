use clap::Args;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::{ServinError, ServinResult};

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Name or ID of the container
    pub target: String,

    /// Only show the last N lines
    #[arg(long)]
    pub tail: Option<usize>,

    /// Only show lines at or after this RFC3339 timestamp
    #[arg(long)]
    pub since: Option<String>,

    /// Only show lines at or before this RFC3339 timestamp
    #[arg(long)]
    pub until: Option<String>,

    /// Poll for and print new lines as they're written
    #[arg(short, long)]
    pub follow: bool,
}

fn parse_timestamp(s: &Option<String>) -> ServinResult<Option<chrono::DateTime<chrono::Utc>>> {
    s.as_deref()
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| ServinError::Validation(format!("invalid timestamp {s}: {e}")))
        })
        .transpose()
}

pub fn run(args: LogsArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    let since = parse_timestamp(&args.since)?;
    let until = parse_timestamp(&args.until)?;

    let mut last_count = 0;
    loop {
        let lines = runtime.logs(&args.target, args.tail, since, until)?;
        for line in lines.iter().skip(last_count) {
            match line.stream {
                servin_core::lifecycle::Stream::Stdout => println!("{}", line.text),
                servin_core::lifecycle::Stream::Stderr => eprintln!("{}", line.text),
            }
        }
        last_count = lines.len();

        if !args.follow {
            break;
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
    Ok(())
}
