//! Core data models for Study AI
//!
//! These are the rows the store hands back to callers. They are plain
//! snapshots: nothing here is cached, every read re-queries the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Session is a named container for uploaded files and a chat history.
/// Exactly one session is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Row identifier
    pub id: i64,

    /// Display name (e.g., "Biology midterm")
    pub name: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Last time a file or chat was added, or the session was activated
    pub last_accessed: DateTime<Utc>,

    /// Whether new uploads and questions go to this session
    pub is_active: bool,
}

/// A session together with live counts of what it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,

    /// Number of files uploaded into the session
    pub file_count: i64,

    /// Number of chat turns recorded in the session
    pub chat_count: i64,
}

/// An uploaded document as listed for a session.
///
/// The extracted text itself is not part of the listing; use
/// `Database::get_file_content` to load it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Row identifier
    pub id: i64,

    /// Session this file belongs to
    pub session_id: i64,

    /// Original filename as uploaded
    pub filename: String,

    /// Where the uploaded copy lives on disk
    pub path: String,

    /// Size in bytes (0 when unknown)
    pub size: i64,

    /// When the file was uploaded
    pub uploaded_at: DateTime<Utc>,

    /// Declared or detected type ("Unknown" when not recorded)
    pub file_type: String,

    /// Why text extraction failed, if it did
    pub extract_error: Option<String>,
}

/// Everything needed to record a new upload.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub session_id: i64,
    pub filename: String,
    pub path: String,
    pub size: i64,
    /// Extracted text, or `None` when extraction failed
    pub content: Option<String>,
    /// Extraction failure message, stored instead of the content
    pub extract_error: Option<String>,
    pub file_type: String,
}

/// A single question and the model's answer. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Row identifier
    pub id: i64,

    /// Session this turn belongs to
    pub session_id: i64,

    /// What the user asked
    pub question: String,

    /// The completed model answer
    pub answer: String,

    /// When the turn was recorded
    pub created_at: DateTime<Utc>,
}

/// A chat turn joined with the name of the session that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatWithSession {
    #[serde(flatten)]
    pub chat: ChatTurn,

    pub session_name: String,
}

/// Aggregate counts over the whole database.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: i64,
    /// Should always be 1
    pub active_sessions: i64,
    pub total_files: i64,
    /// Sum of file sizes in bytes
    pub total_size: i64,
    pub total_chats: i64,
}

/// Outcome of wiping all data.
///
/// Deleting individual uploaded files is best effort; the ones that could
/// not be removed are listed here rather than failing the reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetReport {
    /// Whether the database was wiped and re-initialized
    pub success: bool,

    /// Uploaded files that were removed from disk
    pub removed_files: usize,

    /// Uploaded files that could not be removed, with the reason
    pub failed_paths: Vec<(String, String)>,

    /// Top-level failure message when `success` is false
    pub error: Option<String>,
}
