//! Status command - show current Study AI state.
//!
//! Displays the active session, what it holds, and where data and the
//! model live.

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::storage::Database;

/// Executes the status command.
pub fn run() -> Result<()> {
    let config = Config::load()?;
    let db = Database::open_default()?;

    println!("{}", "Study AI".bold().cyan());
    println!("{}", "Ask questions about your own study material".dimmed());
    println!();

    db.ensure_active_session()?;
    let active = match db.get_active_session()? {
        Some(session) => db.get_session_summary(session.id)?,
        None => None,
    };
    if let Some(summary) = active {
        let session = &summary.session;

        println!("{}", "Active session:".bold());
        println!("  {}  {} ({})", "Name:".dimmed(), session.name.cyan(), session.id);
        println!(
            "  {}  {}",
            "Created:".dimmed(),
            session.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("  {}  {}", "Files:".dimmed(), summary.file_count);
        println!("  {}  {}", "Questions:".dimmed(), summary.chat_count);

        if summary.file_count == 0 {
            println!();
            println!(
                "{}",
                "Hint: Run 'study-ai upload <FILE>' to add study material".yellow()
            );
        }
    }

    println!();
    println!("{}", "Environment:".bold());
    println!("  {}  {}", "Data:".dimmed(), config.data_dir()?.display());
    println!("  {}  {}", "Model:".dimmed(), config.model);
    println!("  {}  {}", "Ollama:".dimmed(), config.ollama_url);

    Ok(())
}
