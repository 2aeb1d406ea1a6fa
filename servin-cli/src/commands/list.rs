use clap::Args;
use comfy_table::Table;
use servin_core::{ServinOptions, ServinRuntime};
use servin_shared::ServinResult;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show every container, including stopped/exited ones
    #[arg(short, long)]
    pub all: bool,
}

pub fn run(args: ListArgs, options: ServinOptions) -> ServinResult<()> {
    let runtime = ServinRuntime::open(options)?;
    let mut records = runtime.list();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut table = Table::new();
    table.set_header(vec!["CONTAINER ID", "NAME", "IMAGE", "STATUS", "CREATED"]);
    for record in records {
        if !args.all && !matches!(record.status, servin_core::store::ContainerStatus::Running) {
            continue;
        }
        table.add_row(vec![
            record.id.short().to_string(),
            record.name,
            record.image,
            format!("{:?}", record.status),
            record.created_at.to_rfc3339(),
        ]);
    }
    println!("{table}");
    Ok(())
}
