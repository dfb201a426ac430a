//! Upload ingestion.
//!
//! Copies a document into the uploads directory, extracts its text and
//! records it against the active session.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use uuid::Uuid;

use crate::extract::{Extraction, TextExtractor};
use crate::storage::{Database, NewFile};

/// A document copied into the uploads directory.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    /// Name of the file as the user supplied it
    pub original_name: String,
    /// Where the copy was written
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Declared type (the lowercased extension, empty if none)
    pub file_type: String,
}

/// Result of ingesting one document.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_id: i64,
    pub session_id: i64,
    pub filename: String,
    pub extraction: Extraction,
}

/// Name for the stored copy: `<YYYYmmdd_HHMMSS>_<name with spaces replaced>`.
pub fn stored_file_name(original_name: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let safe_name = original_name.replace(' ', "_");
    format!("{timestamp}_{safe_name}")
}

/// Copy `source` into `uploads_dir`.
///
/// If a file with the stored name already exists (two uploads of the same
/// name in one second), a short random tag is added to the name.
pub fn save_upload(uploads_dir: &Path, source: &Path) -> Result<SavedUpload> {
    if !source.is_file() {
        bail!("Not a file: {}", source.display());
    }

    let original_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("Upload has no file name")?;

    fs::create_dir_all(uploads_dir)
        .with_context(|| format!("Failed to create {}", uploads_dir.display()))?;

    let mut path = uploads_dir.join(stored_file_name(&original_name));
    if path.exists() {
        let tag = Uuid::new_v4().simple().to_string();
        path = uploads_dir.join(format!("{}_{}", &tag[..8], stored_file_name(&original_name)));
    }

    let size = fs::copy(source, &path)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), path.display()))?;

    let file_type = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    Ok(SavedUpload {
        original_name,
        path,
        size,
        file_type,
    })
}

/// Ingest a document into the active session.
///
/// Creates a session first if none is active. Extraction failures do not
/// fail the upload; they are recorded on the file instead.
pub fn process_upload(
    db: &Database,
    extractor: &dyn TextExtractor,
    uploads_dir: &Path,
    source: &Path,
) -> Result<UploadOutcome> {
    let session_id = match db.get_active_session()? {
        Some(session) => session.id,
        None => db.create_session(None)?,
    };

    let saved = save_upload(uploads_dir, source)?;
    let extraction = extractor.extract(&saved.path, &saved.file_type);

    let file_id = db.add_file(&NewFile {
        session_id,
        filename: saved.original_name.clone(),
        path: saved.path.to_string_lossy().to_string(),
        size: saved.size as i64,
        content: extraction.text().map(str::to_string),
        extract_error: extraction.error_message(),
        file_type: saved.file_type.clone(),
    })?;

    tracing::info!(
        "Uploaded {} to session {} as file {}",
        saved.original_name,
        session_id,
        file_id
    );

    Ok(UploadOutcome {
        file_id,
        session_id,
        filename: saved.original_name,
        extraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentExtractor;
    use tempfile::tempdir;

    #[test]
    fn test_stored_file_name_replaces_spaces() {
        let name = stored_file_name("my lecture notes.txt");
        assert!(name.ends_with("_my_lecture_notes.txt"), "got {name}");
        // YYYYmmdd_HHMMSS_ prefix
        assert_eq!(name.find("_my"), Some(15));
    }

    #[test]
    fn test_save_upload_copies_file() {
        let dir = tempdir().expect("Failed to create temp directory");
        let source = dir.path().join("Chapter 1.TXT");
        fs::write(&source, "hello").expect("write");
        let uploads = dir.path().join("uploads");

        let saved = save_upload(&uploads, &source).expect("Failed to save");
        assert_eq!(saved.original_name, "Chapter 1.TXT");
        assert_eq!(saved.size, 5);
        assert_eq!(saved.file_type, "txt");
        assert!(saved.path.starts_with(&uploads));
        assert_eq!(fs::read_to_string(&saved.path).expect("read"), "hello");
    }

    #[test]
    fn test_save_upload_same_name_twice() {
        let dir = tempdir().expect("Failed to create temp directory");
        let source = dir.path().join("a.txt");
        fs::write(&source, "a").expect("write");
        let uploads = dir.path().join("uploads");

        let first = save_upload(&uploads, &source).expect("save");
        let second = save_upload(&uploads, &source).expect("save");
        assert_ne!(first.path, second.path);
        assert!(first.path.exists() && second.path.exists());
    }

    #[test]
    fn test_save_upload_rejects_directory() {
        let dir = tempdir().expect("Failed to create temp directory");
        assert!(save_upload(&dir.path().join("uploads"), dir.path()).is_err());
    }

    #[test]
    fn test_process_upload_records_file() {
        let dir = tempdir().expect("Failed to create temp directory");
        let db = Database::open(&dir.path().join("study.db")).expect("open");
        let source = dir.path().join("sky.txt");
        fs::write(&source, "The sky is blue.").expect("write");

        let outcome = process_upload(&db, &DocumentExtractor, &dir.path().join("uploads"), &source)
            .expect("Failed to upload");

        let active = db.get_active_session().expect("get").expect("active");
        assert_eq!(outcome.session_id, active.id);
        assert_eq!(outcome.extraction.text(), Some("The sky is blue."));
        assert_eq!(db.get_file_content(outcome.file_id).expect("content"), "The sky is blue.");
        assert_eq!(db.get_session_content(active.id).expect("content"), "The sky is blue.");
    }

    #[test]
    fn test_process_upload_unsupported_is_recorded_not_fatal() {
        let dir = tempdir().expect("Failed to create temp directory");
        let db = Database::open(&dir.path().join("study.db")).expect("open");
        let source = dir.path().join("diagram.png");
        fs::write(&source, [0x89, 0x50, 0x4e, 0x47]).expect("write");

        let outcome = process_upload(&db, &DocumentExtractor, &dir.path().join("uploads"), &source)
            .expect("Upload itself should succeed");

        assert!(outcome.extraction.is_failed());
        let record = db.get_file(outcome.file_id).expect("get").expect("exists");
        assert_eq!(record.extract_error.as_deref(), Some("Unsupported file format: png"));
        assert_eq!(db.get_session_content(outcome.session_id).expect("content"), "");
    }
}
