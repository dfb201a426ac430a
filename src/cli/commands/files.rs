//! Files command - list, inspect and delete uploaded documents.

use std::fs;

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use crate::cli::{format_size, resolve_session, truncate_chars, OutputFormat};
use crate::storage::Database;

/// Arguments for the files command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai files list              Files in the active session\n    \
    study-ai files list --session 2  Files in session 2\n    \
    study-ai files show 7            Show the extracted text of file 7\n    \
    study-ai files delete 7          Remove file 7")]
pub struct Args {
    #[command(subcommand)]
    pub command: FilesCommand,
}

#[derive(Subcommand)]
pub enum FilesCommand {
    /// List the files in a session, newest first
    List {
        /// Session id (defaults to the active session)
        #[arg(long, value_name = "ID")]
        session: Option<i64>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the text extracted from a file
    Show {
        /// File id
        id: i64,
    },
    /// Remove a file from its session and delete the stored copy
    Delete {
        /// File id
        id: i64,
    },
}

/// Executes the files command.
pub fn run(args: Args) -> Result<()> {
    let db = Database::open_default()?;

    match args.command {
        FilesCommand::List { session, format } => list_files(&db, session, format),
        FilesCommand::Show { id } => show_file(&db, id),
        FilesCommand::Delete { id } => delete_file(&db, id),
    }
}

fn list_files(db: &Database, session: Option<i64>, format: OutputFormat) -> Result<()> {
    let session = resolve_session(db, session)?;
    let files = db.list_files(session.id)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("{}", format!("No files in {}.", session.name).dimmed());
        println!();
        println!("Run 'study-ai upload <FILE>' to add study material.");
        return Ok(());
    }

    const ID_WIDTH: usize = 6;
    const NAME_WIDTH: usize = 32;
    const SIZE_WIDTH: usize = 10;
    const UPLOADED_WIDTH: usize = 16;

    println!(
        "{}",
        format!(
            "{:>ID_WIDTH$}  {:<NAME_WIDTH$}  {:>SIZE_WIDTH$}  {:<UPLOADED_WIDTH$}  {}",
            "ID", "NAME", "SIZE", "UPLOADED", "TYPE"
        )
        .bold()
    );

    for file in &files {
        let uploaded = file
            .uploaded_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let kind = if file.extract_error.is_some() {
            format!("{} {}", file.file_type, "(unreadable)".red())
        } else {
            file.file_type.clone()
        };

        println!(
            "{:>ID_WIDTH$}  {:<NAME_WIDTH$}  {:>SIZE_WIDTH$}  {:<UPLOADED_WIDTH$}  {}",
            file.id.to_string().cyan(),
            truncate_chars(&file.filename, NAME_WIDTH),
            format_size(file.size),
            uploaded.dimmed(),
            kind
        );
    }

    Ok(())
}

fn show_file(db: &Database, id: i64) -> Result<()> {
    let Some(file) = db.get_file(id)? else {
        bail!("No file with id {id}. Run 'study-ai files list' to list files.");
    };

    println!("{} {}", "File".bold(), file.filename.cyan());
    println!("  {}  {}", "Type:".dimmed(), file.file_type);
    println!("  {}  {}", "Size:".dimmed(), format_size(file.size));
    println!("  {}  {}", "Stored:".dimmed(), file.path);
    println!();

    match &file.extract_error {
        Some(error) => println!("{}", format!("No text could be read: {error}").yellow()),
        None => {
            let content = db.get_file_content(id)?;
            if content.is_empty() {
                println!("{}", "(no text)".dimmed());
            } else {
                println!("{content}");
            }
        }
    }
    Ok(())
}

fn delete_file(db: &Database, id: i64) -> Result<()> {
    let Some(file) = db.get_file(id)? else {
        bail!("No file with id {id}. Run 'study-ai files list' to list files.");
    };

    if !db.delete_file(id)? {
        bail!("File {id} no longer exists");
    }

    if !file.path.is_empty() {
        if let Err(e) = fs::remove_file(&file.path) {
            tracing::warn!("Could not delete stored copy {}: {}", file.path, e);
        }
    }

    println!("{} {}", "Deleted".green(), file.filename.cyan());
    Ok(())
}
