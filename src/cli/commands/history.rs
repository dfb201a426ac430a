//! History command - show previous questions and answers.

use anyhow::Result;
use colored::Colorize;

use crate::cli::{resolve_session, OutputFormat};
use crate::config::Config;
use crate::storage::Database;

/// Arguments for the history command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai history                 Questions in the active session\n    \
    study-ai history --session 2     Questions in session 2\n    \
    study-ai history --all           Recent questions across all sessions\n    \
    study-ai history --format json   Output as JSON")]
pub struct Args {
    /// Session id (defaults to the active session)
    #[arg(long, value_name = "ID", conflicts_with = "all")]
    pub session: Option<i64>,

    /// Show recent questions from every session, newest first
    #[arg(long)]
    pub all: bool,

    /// Maximum number of questions to display
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Executes the history command.
pub fn run(args: Args) -> Result<()> {
    let limit = match args.limit {
        Some(n) => n,
        None => Config::load()?.chat_history_limit,
    };
    let db = Database::open_default()?;

    if args.all {
        let chats = db.list_all_chats(limit)?;
        if args.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&chats)?);
            return Ok(());
        }
        if chats.is_empty() {
            println!("{}", "No questions asked yet.".dimmed());
            return Ok(());
        }
        for entry in &chats {
            print_turn(
                Some(&entry.session_name),
                &entry.chat.created_at,
                &entry.chat.question,
                &entry.chat.answer,
            );
        }
        return Ok(());
    }

    let session = resolve_session(&db, args.session)?;
    let chats = db.list_chats(session.id, limit)?;

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!("{}", format!("No questions asked in {} yet.", session.name).dimmed());
        return Ok(());
    }

    println!("{} {}", "Session".bold(), session.name.cyan());
    println!();
    for chat in &chats {
        print_turn(None, &chat.created_at, &chat.question, &chat.answer);
    }
    Ok(())
}

fn print_turn(
    session_name: Option<&str>,
    at: &chrono::DateTime<chrono::Utc>,
    question: &str,
    answer: &str,
) {
    let when = at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string();
    match session_name {
        Some(name) => println!("{}  {}", when.dimmed(), name.yellow()),
        None => println!("{}", when.dimmed()),
    }
    println!("{} {}", "Q:".bold().cyan(), question);
    println!("{} {}", "A:".bold().green(), answer);
    println!();
}
