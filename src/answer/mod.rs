//! Answering questions from a session's study material.
//!
//! The flow is: aggregate the session's extracted text, wrap it and the
//! question in the study prompt, stream the model's answer fragment by
//! fragment, and store the turn once the stream has been fully drained.
//! A cancelled or empty answer is never stored.

pub mod engine;
pub mod prompt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::storage::Database;

pub use engine::{CompletionEngine, FragmentStream, OllamaEngine};
pub use prompt::{study_prompt, NOT_IN_MATERIAL};

/// Aggregated material shorter than this (after trimming) is treated as
/// having no readable content.
pub const MIN_CONTEXT_CHARS: usize = 10;

/// Shared flag used to stop consuming an answer early.
///
/// Checked between fragments; setting it never interrupts a fragment that
/// is already being received.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the consumer to stop after the current fragment.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a question ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The stream completed and the turn was stored.
    Completed {
        /// Id of the stored chat turn.
        chat_id: i64,
        /// The full answer text.
        text: String,
    },
    /// The consumer stopped early; nothing was stored.
    Cancelled {
        /// Whatever had been received before cancelling.
        partial: String,
    },
    /// The model produced no text; nothing was stored.
    Empty,
}

/// Errors that can occur while answering a question.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    /// The question was blank.
    #[error("Question is empty")]
    EmptyQuestion,

    /// The session has no uploaded files.
    #[error("Please upload a document first")]
    NoDocuments,

    /// The uploaded files produced no usable text.
    #[error("No readable content found. Please upload valid documents.")]
    NoReadableContent,

    /// Network or connection error when calling the model runtime.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The model runtime returned a non-success HTTP status code.
    #[error("HTTP error ({status}): {body}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The model runtime reported an error inside the stream.
    #[error("Model error: {0}")]
    ApiError(String),

    /// A streamed chunk could not be parsed.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Reading the material or storing the answer failed.
    #[error("Storage error: {0}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for AnswerError {
    fn from(err: anyhow::Error) -> Self {
        AnswerError::Store(err)
    }
}

/// Answer `question` from the material in `session_id`.
///
/// `on_fragment` sees every fragment as it arrives (for live display).
/// The chat turn is stored only when the stream finishes with a non-empty
/// answer and `cancel` was not set.
pub fn ask<F>(
    db: &Database,
    engine: &dyn CompletionEngine,
    session_id: i64,
    question: &str,
    cancel: &CancelFlag,
    mut on_fragment: F,
) -> Result<Answer, AnswerError>
where
    F: FnMut(&str),
{
    let question = question.trim();
    if question.is_empty() {
        return Err(AnswerError::EmptyQuestion);
    }

    if db.list_files(session_id)?.is_empty() {
        return Err(AnswerError::NoDocuments);
    }

    let context = db.get_session_content(session_id)?;
    if context.trim().chars().count() < MIN_CONTEXT_CHARS {
        return Err(AnswerError::NoReadableContent);
    }

    let prompt = study_prompt(&context, question);
    let mut stream = engine.stream(&prompt)?;
    let mut answer = String::new();

    loop {
        if cancel.is_cancelled() {
            tracing::info!("Answer cancelled after {} chars", answer.len());
            return Ok(Answer::Cancelled { partial: answer });
        }
        match stream.next() {
            Some(fragment) => {
                let fragment = fragment?;
                on_fragment(&fragment);
                answer.push_str(&fragment);
            }
            None => break,
        }
    }

    if answer.trim().is_empty() {
        return Ok(Answer::Empty);
    }

    let chat_id = db.add_chat(session_id, question, &answer)?;
    Ok(Answer::Completed {
        chat_id,
        text: answer,
    })
}
