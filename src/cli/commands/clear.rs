//! Clear command - wipe every session, file and question.
//!
//! Goes through the store so that open connections are closed before the
//! database file is removed, and reports any uploaded files that could not
//! be deleted.

use std::io::{self, Write};

use anyhow::{bail, Result};
use colored::Colorize;

use crate::storage::Database;

/// Arguments for the clear command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai clear           Wipe all data (prompts for confirmation)\n    \
    study-ai clear --force   Wipe without confirmation")]
pub struct Args {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Executes the clear command.
pub fn run(args: Args) -> Result<()> {
    let db = Database::open_default()?;
    let stats = db.get_stats()?;

    println!(
        "{}",
        format!(
            "This will permanently delete {} sessions, {} files and {} questions.",
            stats.total_sessions, stats.total_files, stats.total_chats
        )
        .yellow()
    );

    if !args.force {
        print!("Delete all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let report = db.clear_all_data();
    if !report.success {
        bail!(
            "Failed to clear data: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    println!(
        "{} all data ({} uploaded files removed)",
        "Cleared".green(),
        report.removed_files
    );
    for (path, error) in &report.failed_paths {
        println!("  {} {}: {}", "Could not delete".yellow(), path, error);
    }
    Ok(())
}
