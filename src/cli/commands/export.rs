//! Export command - write a session, its files and chat history as JSON.
//!
//! Extracted text is not included; the export describes what was uploaded
//! and what was asked.

use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cli::resolve_session;
use crate::storage::{ChatTurn, Database, FileRecord, Session};

/// Arguments for the export command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai export                           Export the active session\n    \
    study-ai export --session 2               Export session 2\n    \
    study-ai export --output biology.json     Write to a file")]
pub struct Args {
    /// Session id (defaults to the active session)
    #[arg(long, value_name = "ID")]
    pub session: Option<i64>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,
}

/// JSON export structure for a complete session.
#[derive(Debug, Serialize)]
pub struct SessionExport {
    pub session: Session,
    pub files: Vec<FileRecord>,
    pub chats: Vec<ChatTurn>,
    pub exported_at: DateTime<Utc>,
}

/// Collect everything stored for a session.
pub fn build_export(db: &Database, session_id: i64) -> Result<SessionExport> {
    let summary = db
        .get_session_summary(session_id)?
        .with_context(|| format!("No session with id {session_id}"))?;

    let files = db.list_files(session_id)?;
    let chats = db.list_chats(session_id, summary.chat_count.max(0) as usize)?;

    Ok(SessionExport {
        session: summary.session,
        files,
        chats,
        exported_at: Utc::now(),
    })
}

/// Executes the export command.
pub fn run(args: Args) -> Result<()> {
    let db = Database::open_default()?;
    let session = resolve_session(&db, args.session)?;
    let export = build_export(&db, session.id)?;
    let json = serde_json::to_string_pretty(&export)?;

    match args.output {
        Some(path) => {
            fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {path}"))?;
            println!(
                "{} {} to {}",
                "Exported".green(),
                session.name.cyan(),
                path
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
