//! Session command - create, list, switch and delete sessions.
//!
//! Exactly one session is active at a time. Uploads and questions go to
//! the active session unless another is named with `--session`.

use std::io::{self, Write};

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use crate::cli::{resolve_session, OutputFormat};
use crate::config::Config;
use crate::storage::Database;

/// Arguments for the session command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai session new \"Biology\"     Create and activate a session\n    \
    study-ai session list              List recent sessions\n    \
    study-ai session use 3             Switch to session 3\n    \
    study-ai session delete 3 --force  Delete session 3 and everything in it\n    \
    study-ai session clear-chats       Forget the active session's questions")]
pub struct Args {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Create a new session and make it active
    New {
        /// Session name (defaults to "Session <date> <time>")
        name: Option<String>,
    },
    /// List sessions, most recently used first
    List {
        /// Maximum number of sessions to display
        #[arg(short, long, value_name = "N")]
        limit: Option<usize>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Make a session the active one
    Use {
        /// Session id
        id: i64,
    },
    /// Delete a session with its files and chat history
    Delete {
        /// Session id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Delete every question and answer in a session
    ClearChats {
        /// Session id (defaults to the active session)
        #[arg(long, value_name = "ID")]
        session: Option<i64>,
    },
}

/// Executes the session command.
pub fn run(args: Args) -> Result<()> {
    let db = Database::open_default()?;

    match args.command {
        SessionCommand::New { name } => new_session(&db, name.as_deref()),
        SessionCommand::List { limit, format } => {
            let limit = match limit {
                Some(n) => n,
                None => Config::load()?.session_list_limit,
            };
            list_sessions(&db, limit, format)
        }
        SessionCommand::Use { id } => use_session(&db, id),
        SessionCommand::Delete { id, force } => delete_session(&db, id, force),
        SessionCommand::ClearChats { session } => clear_chats(&db, session),
    }
}

fn new_session(db: &Database, name: Option<&str>) -> Result<()> {
    let id = db.create_session(name)?;
    let session = resolve_session(db, Some(id))?;
    println!(
        "{} session {} ({})",
        "Created".green(),
        session.name.cyan(),
        id
    );
    Ok(())
}

fn list_sessions(db: &Database, limit: usize, format: OutputFormat) -> Result<()> {
    let sessions = db.list_sessions(limit)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        OutputFormat::Text => {
            const ID_WIDTH: usize = 6;
            const NAME_WIDTH: usize = 28;
            const USED_WIDTH: usize = 16;

            println!(
                "{}",
                format!(
                    "  {:>ID_WIDTH$}  {:<NAME_WIDTH$}  {:<USED_WIDTH$}  {:>5}  {:>9}",
                    "ID", "NAME", "LAST USED", "FILES", "QUESTIONS"
                )
                .bold()
            );

            for summary in &sessions {
                let session = &summary.session;
                let marker = if session.is_active { "*".green() } else { " ".normal() };
                let name = crate::cli::truncate_chars(&session.name, NAME_WIDTH);
                let used = session
                    .last_accessed
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string();

                println!(
                    "{} {:>ID_WIDTH$}  {:<NAME_WIDTH$}  {:<USED_WIDTH$}  {:>5}  {:>9}",
                    marker,
                    session.id.to_string().cyan(),
                    name,
                    used.dimmed(),
                    summary.file_count,
                    summary.chat_count
                );
            }
        }
    }

    Ok(())
}

fn use_session(db: &Database, id: i64) -> Result<()> {
    if !db.set_active_session(id)? {
        bail!("No session with id {id}. Run 'study-ai session list' to list sessions.");
    }
    let session = resolve_session(db, Some(id))?;
    println!("{} {} ({})", "Switched to".green(), session.name.cyan(), id);
    Ok(())
}

fn delete_session(db: &Database, id: i64, force: bool) -> Result<()> {
    let session = resolve_session(db, Some(id))?;
    let files = db.list_files(id)?;

    println!(
        "{}",
        format!(
            "This will permanently delete session '{}' with {} files and its chat history.",
            session.name,
            files.len()
        )
        .yellow()
    );

    if !force {
        print!("Delete session {}? [y/N] ", id.to_string().cyan());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    if !db.delete_session(id)? {
        bail!("Session {id} no longer exists");
    }
    println!("{} session {}", "Deleted".green(), session.name.cyan());

    if session.is_active {
        if let Some(active) = db.get_active_session()? {
            println!("{} {}", "Active session is now".dimmed(), active.name.cyan());
        }
    }
    Ok(())
}

fn clear_chats(db: &Database, id: Option<i64>) -> Result<()> {
    let session = resolve_session(db, id)?;
    let removed = db.delete_session_chats(session.id)?;
    println!(
        "{} {} questions from {}",
        "Cleared".green(),
        removed,
        session.name.cyan()
    );
    Ok(())
}
