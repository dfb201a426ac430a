//! Text extraction from uploaded documents.
//!
//! Supports plain text, PDF and Word (`.docx`) files. Extraction never
//! fails the upload: the outcome is an [`Extraction`], either the cleaned
//! text or the reason it could not be read. Failed extractions are stored
//! as such and never end up in the question-answering context.

mod docx;

use std::fmt;
use std::fs;
use std::panic::{self, UnwindSafe};
use std::path::Path;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Serializes panic hook swaps in [`catch_panic_quietly`].
static PANIC_HOOK_LOCK: Mutex<()> = Mutex::new(());

/// Document formats we can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// UTF-8 (or close enough) plain text.
    Text,
    /// Office Open XML word processing document.
    Docx,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => write!(f, "pdf"),
            FileKind::Text => write!(f, "txt"),
            FileKind::Docx => write!(f, "docx"),
        }
    }
}

impl FileKind {
    /// Work out the format from a declared type (MIME type or extension)
    /// and the file's own extension. The declared type wins.
    pub fn detect(path: &Path, declared_type: &str) -> Option<Self> {
        let declared = declared_type.to_lowercase();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if declared.contains("pdf") || ext == "pdf" {
            Some(FileKind::Pdf)
        } else if declared.contains("text") || declared == "txt" || ext == "txt" {
            Some(FileKind::Text)
        } else if declared.contains("word") || declared == "docx" || ext == "docx" {
            Some(FileKind::Docx)
        } else {
            None
        }
    }
}

/// Why a document could not be turned into text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The file is not a PDF, TXT or DOCX.
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    /// The text file could not be read.
    #[error("Error reading TXT: {0}")]
    Text(#[from] std::io::Error),

    /// The PDF could not be parsed.
    #[error("Error reading PDF: {0}")]
    Pdf(String),

    /// The Word document could not be parsed.
    #[error("Error reading DOCX: {0}")]
    Docx(String),
}

/// Outcome of extracting a document.
#[derive(Debug)]
pub enum Extraction {
    /// Cleaned text (may be empty for a document with no text).
    Text(String),
    /// Extraction failed.
    Failed(ExtractError),
}

impl Extraction {
    /// The extracted text, if extraction succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            Extraction::Text(text) => Some(text),
            Extraction::Failed(_) => None,
        }
    }

    /// The failure message, if extraction failed.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Extraction::Text(_) => None,
            Extraction::Failed(e) => Some(e.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed(_))
    }
}

impl From<Result<String, ExtractError>> for Extraction {
    fn from(result: Result<String, ExtractError>) -> Self {
        match result {
            Ok(text) => Extraction::Text(text),
            Err(e) => Extraction::Failed(e),
        }
    }
}

/// Something that turns a stored upload into text.
pub trait TextExtractor {
    /// Extract the text of the file at `path`.
    ///
    /// `declared_type` is whatever the uploader said the file was (a MIME
    /// type or an extension); it may be empty.
    fn extract(&self, path: &Path, declared_type: &str) -> Extraction;
}

/// The built-in extractor for PDF, TXT and DOCX files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, path: &Path, declared_type: &str) -> Extraction {
        extract_text(path, declared_type)
    }
}

/// Extract and clean the text of a document.
pub fn extract_text(path: &Path, declared_type: &str) -> Extraction {
    let result = match FileKind::detect(path, declared_type) {
        Some(FileKind::Pdf) => read_pdf(path),
        Some(FileKind::Text) => read_txt(path),
        Some(FileKind::Docx) => docx::read_docx(path),
        None => Err(ExtractError::Unsupported(if declared_type.is_empty() {
            path.display().to_string()
        } else {
            declared_type.to_string()
        })),
    };

    let extraction: Extraction = result.map(|text| clean_text(&text)).into();
    if let Some(message) = extraction.error_message() {
        tracing::warn!("Could not extract {}: {}", path.display(), message);
    }
    extraction
}

fn read_txt(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_pdf(path: &Path) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed documents
    match catch_panic_quietly(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(message) => Err(ExtractError::Pdf(format!("malformed document ({message})"))),
    }
}

/// Run `work`, turning a panic into `Err(message)`.
///
/// The panic is logged through `tracing` instead of the default hook's
/// stderr output. The previous hook is restored afterwards.
fn catch_panic_quietly<T>(work: impl FnOnce() -> T + UnwindSafe) -> Result<T, String> {
    let _lock = PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| {
        tracing::debug!("Recovered from panic in document parser: {}", info);
    }));
    let result = panic::catch_unwind(work);
    panic::set_hook(previous);

    result.map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}

/// Normalize extracted text: drop NUL bytes, collapse every whitespace run
/// (including newlines) to a single space, and trim.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_nul = text.replace('\0', "");
    WHITESPACE_RUN
        .replace_all(&without_nul, " ")
        .trim()
        .to_string()
}
