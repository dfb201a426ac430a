//! Ask command - answer a question from the session's study material.
//!
//! The answer is streamed to the terminal as the model produces it and
//! saved to the session's history once complete.

use std::io::{self, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::answer::{ask, Answer, AnswerError, CancelFlag, OllamaEngine};
use crate::cli::resolve_session;
use crate::config::Config;
use crate::storage::Database;

/// Arguments for the ask command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai ask \"What is photosynthesis?\"\n    \
    study-ai ask --session 2 \"Summarize chapter 3\"\n    \
    study-ai ask --model llama3.1 \"Explain the key terms\"")]
pub struct Args {
    /// The question to ask
    #[arg(value_name = "QUESTION", required = true)]
    pub question: Vec<String>,

    /// Session id (defaults to the active session)
    #[arg(long, value_name = "ID")]
    pub session: Option<i64>,

    /// Model to use instead of the configured one
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Executes the ask command.
pub fn run(args: Args) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(model) = args.model {
        config.model = model;
    }

    let db = Database::open_default()?;
    let session = resolve_session(&db, args.session)?;
    let question = args.question.join(" ");
    let engine = OllamaEngine::from_config(&config)?;

    tracing::debug!("Asking {} in session {}", config.model, session.id);

    // Ctrl+C stops the answer after the current fragment instead of
    // killing the process mid-write.
    let cancel = CancelFlag::new();
    let listener = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || listener.cancel()) {
        tracing::warn!("Failed to install Ctrl+C handler: {err}");
    }

    let mut stdout = io::stdout();
    let result = ask(
        &db,
        &engine,
        session.id,
        &question,
        &cancel,
        |fragment| {
            // A closed pipe should not abort the answer
            let _ = write!(stdout, "{fragment}");
            let _ = stdout.flush();
        },
    );

    match result {
        Ok(Answer::Completed { .. }) => {
            println!();
            Ok(())
        }
        Ok(Answer::Cancelled { .. }) => {
            println!();
            println!("{}", "Cancelled; the answer was not saved".dimmed());
            Ok(())
        }
        Ok(Answer::Empty) => {
            println!("{}", "The model returned an empty answer".yellow());
            Ok(())
        }
        Err(e @ (AnswerError::NoDocuments | AnswerError::NoReadableContent)) => {
            Err(anyhow::Error::new(e)).context(format!(
                "Nothing to answer from in '{}'. Run 'study-ai upload <FILE>' first",
                session.name
            ))
        }
        Err(e @ AnswerError::RequestFailed(_)) => Err(anyhow::Error::new(e)).context(format!(
            "Could not reach Ollama at {}. Is 'ollama serve' running?",
            config.ollama_url
        )),
        Err(e) => Err(e.into()),
    }
}
