//! Command-line interface for Study AI.
//!
//! Provides the CLI commands for managing sessions, uploading study
//! material, asking questions and maintaining the local data directory.

use anyhow::{bail, Result};

use crate::storage::{Database, Session};

/// Individual CLI command implementations.
pub mod commands;

/// Output formatting utilities.
pub mod format;

pub use format::OutputFormat;

/// Resolve `--session ID` to a session, falling back to the active one.
pub fn resolve_session(db: &Database, id: Option<i64>) -> Result<Session> {
    match id {
        Some(id) => match db.get_session(id)? {
            Some(session) => Ok(session),
            None => bail!(
                "No session with id {id}. Run 'study-ai session list' to list sessions."
            ),
        },
        None => {
            db.ensure_active_session()?;
            match db.get_active_session()? {
                Some(session) => Ok(session),
                None => bail!("No active session"),
            }
        }
    }
}

/// Human-readable byte size ("512 B", "1.5 KB", "2.0 MB").
pub fn format_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Truncates a string to at most `max_chars` characters, appending "..."
/// when it was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}
