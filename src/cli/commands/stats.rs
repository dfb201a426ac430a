//! Stats command - aggregate counts across every session.

use anyhow::Result;
use colored::Colorize;

use crate::cli::{format_size, OutputFormat};
use crate::storage::Database;

/// Arguments for the stats command.
#[derive(clap::Args)]
pub struct Args {
    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Executes the stats command.
pub fn run(args: Args) -> Result<()> {
    let db = Database::open_default()?;
    let stats = db.get_stats()?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("{}", "Statistics".bold());
            println!("  {}  {}", "Sessions:".dimmed(), stats.total_sessions);
            println!("  {}  {}", "Active:".dimmed(), stats.active_sessions);
            println!("  {}  {}", "Files:".dimmed(), stats.total_files);
            println!("  {}  {}", "Stored:".dimmed(), format_size(stats.total_size));
            println!("  {}  {}", "Questions:".dimmed(), stats.total_chats);
        }
    }
    Ok(())
}
