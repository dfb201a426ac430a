//! SQLite storage layer for Study AI
//!
//! One [`Database`] owns a [`ConnectionPool`] and exposes every store
//! operation as a single transaction. It also keeps the "exactly one active
//! session" invariant: the schema does not enforce it, so every operation
//! that could break it repairs it inside the same transaction.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Transaction};

use super::models::{
    ChatTurn, ChatWithSession, FileRecord, NewFile, ResetReport, Session, SessionSummary, Stats,
};
use super::pool::{ConnectionPool, PoolConfig};
use crate::config::Config;

/// Name given to the session created when no session is active.
pub const DEFAULT_SESSION_NAME: &str = "Default Session";

/// Get the default database path
pub fn default_db_path() -> Result<PathBuf> {
    let config = Config::load()?;
    config.db_path()
}

/// Current time in the format stored in every timestamp column.
///
/// Fixed-width RFC 3339 with microseconds, so string order is time order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Database handle
pub struct Database {
    pool: ConnectionPool,
    uploads_dir: Option<PathBuf>,
}

impl Database {
    /// Open or create the database.
    ///
    /// Uploaded files are expected in an `uploads` directory next to the
    /// database file.
    pub fn open(path: &Path) -> Result<Self> {
        let pool = ConnectionPool::open(path, PoolConfig::default())?;
        let uploads_dir = path.parent().map(|p| p.join("uploads"));
        let mut db = Self::with_pool(pool)?;
        db.uploads_dir = uploads_dir;
        Ok(db)
    }

    /// Open the database configured in `~/.study-ai/config.yaml`
    pub fn open_default() -> Result<Self> {
        let config = Config::load()?;
        let db = Self::open(&config.db_path()?)?;
        Ok(db.with_uploads_dir(config.uploads_dir()?))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_pool(ConnectionPool::in_memory()?)
    }

    /// Build a store on an existing pool, creating the schema and a default
    /// active session if needed.
    pub fn with_pool(pool: ConnectionPool) -> Result<Self> {
        let db = Self {
            pool,
            uploads_dir: None,
        };
        db.initialize()?;
        Ok(db)
    }

    /// Set the directory that holds uploaded files.
    pub fn with_uploads_dir(mut self, dir: PathBuf) -> Self {
        self.uploads_dir = Some(dir);
        self
    }

    /// Directory that holds uploaded files, if this store has one.
    pub fn uploads_dir(&self) -> Option<&Path> {
        self.uploads_dir.as_deref()
    }

    /// Path of the database file (`None` when in memory).
    pub fn path(&self) -> Option<&Path> {
        self.pool.path()
    }

    /// The pool backing this store.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn initialize(&self) -> Result<()> {
        self.pool.with_write_transaction(|tx| {
            Self::migrate(tx)?;
            Self::ensure_active_in(tx)?;
            Ok(())
        })
    }

    /// Create tables and indexes
    fn migrate(tx: &Transaction<'_>) -> Result<()> {
        tx.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_name TEXT NOT NULL DEFAULT 'Untitled Session',
                created_at TEXT NOT NULL,
                last_accessed TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                filename TEXT NOT NULL,
                filepath TEXT NOT NULL,
                filesize INTEGER,
                content_text TEXT,
                extract_error TEXT,
                upload_time TEXT NOT NULL,
                file_type TEXT,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(is_active);
            CREATE INDEX IF NOT EXISTS idx_files_session ON files(session_id);
            CREATE INDEX IF NOT EXISTS idx_chats_session ON chats(session_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== Sessions ====================

    /// Make sure some session is active, creating a default one if not.
    ///
    /// Returns the id of the active session.
    pub fn ensure_active_session(&self) -> Result<i64> {
        self.pool.with_write_transaction(Self::ensure_active_in)
    }

    fn ensure_active_in(tx: &Transaction<'_>) -> Result<i64> {
        let active: Option<i64> = tx
            .query_row(
                "SELECT id FROM sessions WHERE is_active = 1 ORDER BY id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = active {
            return Ok(id);
        }

        let ts = now();
        tx.execute(
            "INSERT INTO sessions (session_name, created_at, last_accessed, is_active) VALUES (?1, ?2, ?2, 1)",
            params![DEFAULT_SESSION_NAME, ts],
        )?;
        let id = tx.last_insert_rowid();
        tracing::info!("Created default session {}", id);
        Ok(id)
    }

    /// Create a new session and make it the active one.
    ///
    /// An empty or missing name becomes "Session YYYY-MM-DD HH:MM".
    pub fn create_session(&self, name: Option<&str>) -> Result<i64> {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("Session {}", Local::now().format("%Y-%m-%d %H:%M")),
        };

        let id = self.pool.with_write_transaction(|tx| {
            tx.execute("UPDATE sessions SET is_active = 0 WHERE is_active = 1", [])?;
            let ts = now();
            tx.execute(
                "INSERT INTO sessions (session_name, created_at, last_accessed, is_active) VALUES (?1, ?2, ?2, 1)",
                params![name, ts],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        tracing::info!("Created session {} ({})", id, name);
        Ok(id)
    }

    /// Get the currently active session
    pub fn get_active_session(&self) -> Result<Option<Session>> {
        self.pool.with_transaction(|tx| {
            tx.query_row(
                "SELECT id, session_name, created_at, last_accessed, is_active
                 FROM sessions WHERE is_active = 1 ORDER BY id LIMIT 1",
                [],
                Self::row_to_session,
            )
            .optional()
            .context("Failed to get active session")
        })
    }

    /// Get a session by ID
    pub fn get_session(&self, id: i64) -> Result<Option<Session>> {
        self.pool.with_transaction(|tx| {
            tx.query_row(
                "SELECT id, session_name, created_at, last_accessed, is_active
                 FROM sessions WHERE id = ?1",
                params![id],
                Self::row_to_session,
            )
            .optional()
            .context("Failed to get session")
        })
    }

    /// Make `id` the active session and refresh its last-accessed time.
    ///
    /// Returns false, and changes nothing, if the session doesn't exist.
    pub fn set_active_session(&self, id: i64) -> Result<bool> {
        let switched = self.pool.with_write_transaction(|tx| {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Ok(false);
            }

            tx.execute("UPDATE sessions SET is_active = 0 WHERE is_active = 1", [])?;
            tx.execute(
                "UPDATE sessions SET is_active = 1, last_accessed = MAX(last_accessed, ?2) WHERE id = ?1",
                params![id, now()],
            )?;
            Ok(true)
        })?;

        if switched {
            tracing::info!("Switched to session {}", id);
        }
        Ok(switched)
    }

    /// List sessions, most recently accessed first, with file and chat counts
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        self.pool.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, session_name, created_at, last_accessed, is_active,
                        (SELECT COUNT(*) FROM files WHERE session_id = sessions.id) AS file_count,
                        (SELECT COUNT(*) FROM chats WHERE session_id = sessions.id) AS chat_count
                 FROM sessions
                 ORDER BY last_accessed DESC, id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit], |row| {
                Ok(SessionSummary {
                    session: Self::row_to_session(row)?,
                    file_count: row.get(5)?,
                    chat_count: row.get(6)?,
                })
            })?;

            let sessions = rows
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to list sessions")?;
            Ok(sessions)
        })
    }

    /// A single session with its file and chat counts
    pub fn get_session_summary(&self, id: i64) -> Result<Option<SessionSummary>> {
        self.pool.with_transaction(|tx| {
            let summary = tx
                .query_row(
                    "SELECT id, session_name, created_at, last_accessed, is_active,
                            (SELECT COUNT(*) FROM files WHERE session_id = sessions.id),
                            (SELECT COUNT(*) FROM chats WHERE session_id = sessions.id)
                     FROM sessions
                     WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(SessionSummary {
                            session: Self::row_to_session(row)?,
                            file_count: row.get(5)?,
                            chat_count: row.get(6)?,
                        })
                    },
                )
                .optional()?;
            Ok(summary)
        })
    }

    /// Delete a session along with its files and chats.
    ///
    /// If that leaves no active session, a default one is created in the
    /// same transaction. Returns whether a session was deleted.
    pub fn delete_session(&self, id: i64) -> Result<bool> {
        let deleted = self.pool.with_write_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Ok(false);
            }
            Self::ensure_active_in(tx)?;
            Ok(true)
        })?;

        if deleted {
            tracing::info!("Deleted session {}", id);
        }
        Ok(deleted)
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: parse_timestamp(2, row.get(2)?)?,
            last_accessed: parse_timestamp(3, row.get(3)?)?,
            is_active: row.get(4)?,
        })
    }

    fn touch_session(tx: &Transaction<'_>, session_id: i64) -> Result<()> {
        tx.execute(
            "UPDATE sessions SET last_accessed = MAX(last_accessed, ?2) WHERE id = ?1",
            params![session_id, now()],
        )?;
        Ok(())
    }

    // ==================== Files ====================

    /// Record an uploaded file and refresh its session's last-accessed time
    pub fn add_file(&self, file: &NewFile) -> Result<i64> {
        let id = self.pool.with_write_transaction(|tx| {
            tx.execute(
                r#"
                INSERT INTO files (session_id, filename, filepath, filesize, content_text, extract_error, upload_time, file_type)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    file.session_id,
                    file.filename,
                    file.path,
                    file.size,
                    file.content,
                    file.extract_error,
                    now(),
                    file.file_type,
                ],
            )?;
            let id = tx.last_insert_rowid();
            Self::touch_session(tx, file.session_id)?;
            Ok(id)
        })?;

        tracing::debug!("Added file {} ({}) to session {}", id, file.filename, file.session_id);
        Ok(id)
    }

    /// List files in a session, newest upload first
    pub fn list_files(&self, session_id: i64) -> Result<Vec<FileRecord>> {
        self.pool.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, session_id, filename, filepath, filesize, upload_time, file_type, extract_error
                 FROM files
                 WHERE session_id = ?1
                 ORDER BY upload_time DESC, id DESC",
            )?;

            let rows = stmt.query_map(params![session_id], Self::row_to_file)?;
            let files = rows
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to list files")?;
            Ok(files)
        })
    }

    /// Get a single file record by ID
    pub fn get_file(&self, id: i64) -> Result<Option<FileRecord>> {
        self.pool.with_transaction(|tx| {
            tx.query_row(
                "SELECT id, session_id, filename, filepath, filesize, upload_time, file_type, extract_error
                 FROM files WHERE id = ?1",
                params![id],
                Self::row_to_file,
            )
            .optional()
            .context("Failed to get file")
        })
    }

    /// Get the extracted text of a file, or an empty string
    pub fn get_file_content(&self, id: i64) -> Result<String> {
        self.pool.with_transaction(|tx| {
            let content: Option<Option<String>> = tx
                .query_row(
                    "SELECT content_text FROM files WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(content.flatten().unwrap_or_default())
        })
    }

    /// Concatenate the extracted text of every file in a session.
    ///
    /// Files without text (including failed extractions) are skipped.
    /// Texts are joined by a blank line in upload order.
    pub fn get_session_content(&self, session_id: i64) -> Result<String> {
        self.pool.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT content_text FROM files
                 WHERE session_id = ?1 AND content_text IS NOT NULL AND content_text != ''
                 ORDER BY upload_time, id",
            )?;

            let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;
            let contents = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(contents.join("\n\n"))
        })
    }

    /// Delete a file record. The file on disk is left alone.
    pub fn delete_file(&self, id: i64) -> Result<bool> {
        let deleted = self
            .pool
            .with_write_transaction(|tx| Ok(tx.execute("DELETE FROM files WHERE id = ?1", params![id])?))?;
        Ok(deleted > 0)
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
        Ok(FileRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            filename: row.get(2)?,
            path: row.get(3)?,
            size: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            uploaded_at: parse_timestamp(5, row.get(5)?)?,
            file_type: row
                .get::<_, Option<String>>(6)?
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            extract_error: row.get(7)?,
        })
    }

    // ==================== Chats ====================

    /// Record a question and its answer, refreshing the session's last-accessed time
    pub fn add_chat(&self, session_id: i64, question: &str, answer: &str) -> Result<i64> {
        let id = self.pool.with_write_transaction(|tx| {
            tx.execute(
                "INSERT INTO chats (session_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, question, answer, now()],
            )?;
            let id = tx.last_insert_rowid();
            Self::touch_session(tx, session_id)?;
            Ok(id)
        })?;

        tracing::debug!("Added chat {} to session {}", id, session_id);
        Ok(id)
    }

    /// Chat history of a session in chronological order
    pub fn list_chats(&self, session_id: i64, limit: usize) -> Result<Vec<ChatTurn>> {
        self.pool.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, session_id, question, answer, created_at
                 FROM chats
                 WHERE session_id = ?1
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2",
            )?;

            let rows = stmt.query_map(params![session_id, limit], Self::row_to_chat)?;
            let chats = rows
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to list chats")?;
            Ok(chats)
        })
    }

    /// Most recent chats across all sessions, with the owning session's name
    pub fn list_all_chats(&self, limit: usize) -> Result<Vec<ChatWithSession>> {
        self.pool.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT c.id, c.session_id, c.question, c.answer, c.created_at, s.session_name
                 FROM chats c
                 JOIN sessions s ON c.session_id = s.id
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit], |row| {
                Ok(ChatWithSession {
                    chat: Self::row_to_chat(row)?,
                    session_name: row.get(5)?,
                })
            })?;
            let chats = rows
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to list chats")?;
            Ok(chats)
        })
    }

    /// Delete every chat in a session, returning how many were removed
    pub fn delete_session_chats(&self, session_id: i64) -> Result<usize> {
        self.pool.with_write_transaction(|tx| {
            Ok(tx.execute("DELETE FROM chats WHERE session_id = ?1", params![session_id])?)
        })
    }

    fn row_to_chat(row: &rusqlite::Row) -> rusqlite::Result<ChatTurn> {
        Ok(ChatTurn {
            id: row.get(0)?,
            session_id: row.get(1)?,
            question: row.get(2)?,
            answer: row.get(3)?,
            created_at: parse_timestamp(4, row.get(4)?)?,
        })
    }

    // ==================== Stats ====================

    /// Aggregate counts over the whole database
    pub fn get_stats(&self) -> Result<Stats> {
        self.pool.with_transaction(|tx| {
            let count = |sql: &str| -> rusqlite::Result<i64> { tx.query_row(sql, [], |row| row.get(0)) };

            Ok(Stats {
                total_sessions: count("SELECT COUNT(*) FROM sessions")?,
                active_sessions: count("SELECT COUNT(*) FROM sessions WHERE is_active = 1")?,
                total_files: count("SELECT COUNT(*) FROM files")?,
                total_size: count("SELECT COALESCE(SUM(filesize), 0) FROM files")?,
                total_chats: count("SELECT COUNT(*) FROM chats")?,
            })
        })
    }

    // ==================== Reset ====================

    /// Wipe everything: the database file, every uploaded file it knows
    /// about, then re-create the schema and a default active session.
    ///
    /// Never returns an error; failures are logged and reported.
    pub fn clear_all_data(&self) -> ResetReport {
        match self.try_clear_all_data() {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Error clearing data: {:#}", e);
                // The database file may already be gone
                if let Err(init_err) = self.initialize() {
                    tracing::warn!("Could not re-initialize after failed reset: {:#}", init_err);
                }
                ResetReport {
                    success: false,
                    error: Some(format!("{e:#}")),
                    ..ResetReport::default()
                }
            }
        }
    }

    fn try_clear_all_data(&self) -> Result<ResetReport> {
        let file_paths: Vec<String> = self.pool.with_transaction(|tx| {
            let mut stmt = tx.prepare("SELECT filepath FROM files")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let paths = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(paths)
        })?;

        self.pool.reopen(|db_path| match db_path {
            Some(path) => remove_database_files(path),
            None => Ok(()),
        })?;

        let mut report = ResetReport::default();
        for file_path in file_paths {
            if file_path.is_empty() || !Path::new(&file_path).exists() {
                continue;
            }
            match fs::remove_file(&file_path) {
                Ok(()) => report.removed_files += 1,
                Err(e) => {
                    tracing::warn!("Could not delete uploaded file {}: {}", file_path, e);
                    report.failed_paths.push((file_path, e.to_string()));
                }
            }
        }

        if let Some(dir) = &self.uploads_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to recreate {}", dir.display()))?;
        }

        self.initialize()?;

        tracing::info!(
            "Cleared all data ({} files removed, {} failed)",
            report.removed_files,
            report.failed_paths.len()
        );
        report.success = true;
        Ok(report)
    }
}

/// Remove a SQLite database file and its WAL companions, if present.
pub fn remove_database_files(path: &Path) -> Result<()> {
    let mut targets = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        targets.push(PathBuf::from(name));
    }

    for target in targets {
        if target.exists() {
            fs::remove_file(&target)
                .with_context(|| format!("Failed to delete {}", target.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Creates a test database in a temporary directory.
    /// Returns the Database instance and the temp directory (which must be kept alive).
    fn create_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).expect("Failed to open test database");
        (db, dir)
    }

    /// Builds a file record with extracted text for the given session.
    fn text_file(session_id: i64, name: &str, content: &str) -> NewFile {
        NewFile {
            session_id,
            filename: name.to_string(),
            path: format!("/uploads/{name}"),
            size: content.len() as i64,
            content: Some(content.to_string()),
            extract_error: None,
            file_type: "txt".to_string(),
        }
    }

    fn active_count(db: &Database) -> i64 {
        db.get_stats().expect("Failed to get stats").active_sessions
    }

    // ==================== Session Tests ====================

    #[test]
    fn test_new_database_has_default_active_session() {
        let (db, _dir) = create_test_db();

        let active = db
            .get_active_session()
            .expect("Failed to get active session")
            .expect("A default session should exist");

        assert_eq!(active.name, DEFAULT_SESSION_NAME);
        assert!(active.is_active);
        assert_eq!(active_count(&db), 1);
    }

    #[test]
    fn test_reopen_does_not_add_sessions() {
        let dir = tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("test.db");

        drop(Database::open(&db_path).expect("Failed to open"));
        let db = Database::open(&db_path).expect("Failed to reopen");

        assert_eq!(db.get_stats().expect("stats").total_sessions, 1);
    }

    #[test]
    fn test_create_session_becomes_only_active() {
        let (db, _dir) = create_test_db();

        let id = db.create_session(Some("Biology")).expect("Failed to create session");

        let active = db
            .get_active_session()
            .expect("Failed to get active session")
            .expect("Should have an active session");
        assert_eq!(active.id, id);
        assert_eq!(active.name, "Biology");
        assert_eq!(active_count(&db), 1, "Only one session may be active");
    }

    #[test]
    fn test_create_session_default_name() {
        let (db, _dir) = create_test_db();

        let id = db.create_session(None).expect("Failed to create session");
        let blank = db.create_session(Some("   ")).expect("Failed to create session");

        for id in [id, blank] {
            let session = db
                .get_session(id)
                .expect("Failed to get session")
                .expect("Session should exist");
            assert!(
                session.name.starts_with("Session "),
                "Unexpected default name: {}",
                session.name
            );
        }
    }

    #[test]
    fn test_set_active_session() {
        let (db, _dir) = create_test_db();
        let first = db.create_session(Some("First")).expect("create");
        let second = db.create_session(Some("Second")).expect("create");

        let before = db.get_session(first).expect("get").expect("exists");
        assert!(db.set_active_session(first).expect("Failed to switch"));

        let active = db.get_active_session().expect("get").expect("active");
        assert_eq!(active.id, first);
        assert!(active.last_accessed >= before.last_accessed);
        assert!(!db.get_session(second).expect("get").expect("exists").is_active);
        assert_eq!(active_count(&db), 1);
    }

    #[test]
    fn test_set_active_session_unknown_id_changes_nothing() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Keep me")).expect("create");

        assert!(!db.set_active_session(9999).expect("Query should succeed"));

        let active = db.get_active_session().expect("get").expect("active");
        assert_eq!(active.id, id, "Active session should be unchanged");
        assert_eq!(active_count(&db), 1);
    }

    #[test]
    fn test_list_sessions_ordered_and_limited() {
        let (db, _dir) = create_test_db();
        let a = db.create_session(Some("A")).expect("create");
        let b = db.create_session(Some("B")).expect("create");
        let c = db.create_session(Some("C")).expect("create");

        // Touching A moves it to the front
        db.add_chat(a, "q", "a").expect("Failed to add chat");

        let sessions = db.list_sessions(3).expect("Failed to list sessions");
        assert_eq!(sessions.len(), 3, "Should respect limit");
        assert_eq!(sessions[0].session.id, a);
        assert_eq!(sessions[1].session.id, c);
        assert_eq!(sessions[2].session.id, b);

        for pair in sessions.windows(2) {
            assert!(pair[0].session.last_accessed >= pair[1].session.last_accessed);
        }

        assert_eq!(sessions[0].chat_count, 1);
        assert_eq!(sessions[0].file_count, 0);
    }

    #[test]
    fn test_list_sessions_counts() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Counted")).expect("create");

        db.add_file(&text_file(id, "a.txt", "alpha")).expect("add file");
        db.add_file(&text_file(id, "b.txt", "beta")).expect("add file");
        db.add_chat(id, "q1", "a1").expect("add chat");

        let sessions = db.list_sessions(10).expect("list");
        let summary = sessions
            .iter()
            .find(|s| s.session.id == id)
            .expect("Session should be listed");
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.chat_count, 1);
    }

    #[test]
    fn test_get_session_summary() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Single")).expect("create");
        db.add_file(&text_file(id, "a.txt", "alpha")).expect("add file");

        let summary = db
            .get_session_summary(id)
            .expect("get")
            .expect("Session should exist");
        assert_eq!(summary.session.name, "Single");
        assert_eq!(summary.file_count, 1);
        assert_eq!(summary.chat_count, 0);

        assert!(db.get_session_summary(id + 100).expect("get").is_none());
    }

    #[test]
    fn test_delete_session_cascades() {
        let (db, _dir) = create_test_db();
        let keep = db.create_session(Some("Keep")).expect("create");
        let doomed = db.create_session(Some("Doomed")).expect("create");

        db.add_file(&text_file(doomed, "a.txt", "alpha")).expect("add file");
        db.add_chat(doomed, "q", "a").expect("add chat");
        db.add_file(&text_file(keep, "k.txt", "kept")).expect("add file");

        assert!(db.delete_session(doomed).expect("Failed to delete"));

        assert!(db.list_files(doomed).expect("list").is_empty());
        assert!(db.list_chats(doomed, 50).expect("list").is_empty());
        assert_eq!(db.list_files(keep).expect("list").len(), 1);

        let stats = db.get_stats().expect("stats");
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_chats, 0);
    }

    #[test]
    fn test_delete_active_session_creates_default() {
        let (db, _dir) = create_test_db();
        let first = db.create_session(Some("First")).expect("create");
        let second = db.create_session(Some("Second")).expect("create");

        assert!(db.delete_session(second).expect("delete"));

        let active = db.get_active_session().expect("get").expect("active");
        assert_ne!(active.id, first, "Older session is not reactivated");
        assert_ne!(active.id, second);
        assert_eq!(active.name, DEFAULT_SESSION_NAME);
        assert_eq!(active_count(&db), 1);
    }

    #[test]
    fn test_delete_inactive_session_keeps_active() {
        let (db, _dir) = create_test_db();
        let first = db.create_session(Some("First")).expect("create");
        let second = db.create_session(Some("Second")).expect("create");

        assert!(db.delete_session(first).expect("delete"));

        let active = db.get_active_session().expect("get").expect("active");
        assert_eq!(active.id, second);
        assert_eq!(active_count(&db), 1);
    }

    #[test]
    fn test_delete_missing_session() {
        let (db, _dir) = create_test_db();
        assert!(!db.delete_session(4242).expect("delete"));
        assert_eq!(active_count(&db), 1);
    }

    #[test]
    fn test_exactly_one_active_across_operations() {
        let (db, _dir) = create_test_db();
        let mut ids = vec![db.get_active_session().expect("get").expect("active").id];

        for i in 0..4 {
            ids.push(db.create_session(Some(&format!("S{i}"))).expect("create"));
            assert_eq!(active_count(&db), 1);
        }
        for id in ids.iter().rev().step_by(2) {
            db.set_active_session(*id).expect("switch");
            assert_eq!(active_count(&db), 1);
        }
        for id in &ids {
            db.delete_session(*id).expect("delete");
            assert_eq!(active_count(&db), 1);
        }
    }

    // ==================== File Tests ====================

    #[test]
    fn test_add_and_list_files() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Files")).expect("create");

        let first = db.add_file(&text_file(id, "one.txt", "one")).expect("add");
        let second = db.add_file(&text_file(id, "two.txt", "two")).expect("add");

        let files = db.list_files(id).expect("list");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, second, "Newest upload should be first");
        assert_eq!(files[1].id, first);
        assert_eq!(files[0].filename, "two.txt");
        assert_eq!(files[0].size, 3);
        assert_eq!(files[0].file_type, "txt");
    }

    #[test]
    fn test_list_files_defaults_for_missing_size_and_type() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Defaults")).expect("create");
        let file_id = db.add_file(&text_file(id, "x", "x")).expect("add");

        db.pool()
            .with_write_transaction(|tx| {
                tx.execute(
                    "UPDATE files SET filesize = NULL, file_type = NULL WHERE id = ?1",
                    params![file_id],
                )?;
                Ok(())
            })
            .expect("Failed to null out columns");

        let file = db.get_file(file_id).expect("get").expect("exists");
        assert_eq!(file.size, 0);
        assert_eq!(file.file_type, "Unknown");
    }

    #[test]
    fn test_add_file_touches_session() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Touched")).expect("create");
        let before = db.get_session(id).expect("get").expect("exists").last_accessed;

        db.add_file(&text_file(id, "a.txt", "alpha")).expect("add");

        let after = db.get_session(id).expect("get").expect("exists").last_accessed;
        assert!(after >= before);
    }

    #[test]
    fn test_get_file_content() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Content")).expect("create");
        let file_id = db
            .add_file(&text_file(id, "sky.txt", "The sky is blue."))
            .expect("add");

        assert_eq!(db.get_file_content(file_id).expect("get"), "The sky is blue.");
        assert_eq!(db.get_file_content(9999).expect("get"), "");
    }

    #[test]
    fn test_session_content_empty() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Empty")).expect("create");

        assert_eq!(db.get_session_content(id).expect("content"), "");

        db.add_file(&text_file(id, "blank.txt", "")).expect("add");
        let mut failed = text_file(id, "broken.pdf", "");
        failed.content = None;
        failed.extract_error = Some("Error reading PDF: bad xref".to_string());
        db.add_file(&failed).expect("add");

        assert_eq!(db.get_session_content(id).expect("content"), "");
    }

    #[test]
    fn test_session_content_joins_with_blank_line() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Joined")).expect("create");
        let other = db.create_session(Some("Other")).expect("create");

        db.add_file(&text_file(id, "a.txt", "Alpha")).expect("add");
        db.add_file(&text_file(id, "b.txt", "Beta")).expect("add");
        db.add_file(&text_file(other, "c.txt", "Gamma")).expect("add");

        let content = db.get_session_content(id).expect("content");
        let mut parts: Vec<&str> = content.split("\n\n").collect();
        parts.sort_unstable();
        assert_eq!(parts, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_failed_extraction_excluded_from_content() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Mixed")).expect("create");

        db.add_file(&text_file(id, "good.txt", "Real notes")).expect("add");
        let mut failed = text_file(id, "bad.docx", "");
        failed.content = None;
        failed.extract_error = Some("Error reading DOCX: not a zip".to_string());
        let bad_id = db.add_file(&failed).expect("add");

        assert_eq!(db.get_session_content(id).expect("content"), "Real notes");
        let record = db.get_file(bad_id).expect("get").expect("exists");
        assert_eq!(
            record.extract_error.as_deref(),
            Some("Error reading DOCX: not a zip")
        );
    }

    #[test]
    fn test_delete_file() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Delete")).expect("create");
        let file_id = db.add_file(&text_file(id, "a.txt", "alpha")).expect("add");

        assert!(db.delete_file(file_id).expect("delete"));
        assert!(!db.delete_file(file_id).expect("delete twice"));
        assert!(db.list_files(id).expect("list").is_empty());
    }

    // ==================== Chat Tests ====================

    #[test]
    fn test_list_chats_chronological_and_limited() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Chats")).expect("create");

        for i in 0..5 {
            db.add_chat(id, &format!("q{i}"), &format!("a{i}")).expect("add");
        }

        let chats = db.list_chats(id, 3).expect("list");
        assert_eq!(chats.len(), 3);
        assert_eq!(chats[0].question, "q0");
        assert_eq!(chats[2].question, "q2");
    }

    #[test]
    fn test_list_all_chats_newest_first_with_session_name() {
        let (db, _dir) = create_test_db();
        let a = db.create_session(Some("Alpha")).expect("create");
        let b = db.create_session(Some("Beta")).expect("create");

        db.add_chat(a, "first", "1").expect("add");
        db.add_chat(b, "second", "2").expect("add");

        let chats = db.list_all_chats(10).expect("list");
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].chat.question, "second");
        assert_eq!(chats[0].session_name, "Beta");
        assert_eq!(chats[1].session_name, "Alpha");
    }

    #[test]
    fn test_delete_session_chats() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Chats")).expect("create");
        let other = db.create_session(Some("Other")).expect("create");

        db.add_chat(id, "q1", "a1").expect("add");
        db.add_chat(id, "q2", "a2").expect("add");
        db.add_chat(other, "q3", "a3").expect("add");

        assert_eq!(db.delete_session_chats(id).expect("delete"), 2);
        assert_eq!(db.delete_session_chats(id).expect("delete"), 0);
        assert_eq!(db.list_chats(other, 50).expect("list").len(), 1);
    }

    // ==================== Stats & Reset Tests ====================

    #[test]
    fn test_stats() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Stats")).expect("create");
        db.add_file(&text_file(id, "a.txt", "12345")).expect("add");
        db.add_file(&text_file(id, "b.txt", "123")).expect("add");
        db.add_chat(id, "q", "a").expect("add");

        let stats = db.get_stats().expect("stats");
        assert_eq!(
            stats,
            Stats {
                total_sessions: 2,
                active_sessions: 1,
                total_files: 2,
                total_size: 8,
                total_chats: 1,
            }
        );
    }

    #[test]
    fn test_reads_are_not_cached() {
        let (db, _dir) = create_test_db();
        let id = db.create_session(Some("Fresh")).expect("create");
        assert_eq!(db.get_stats().expect("stats").total_chats, 0);

        db.pool()
            .with_write_transaction(|tx| {
                tx.execute(
                    "INSERT INTO chats (session_id, question, answer, created_at) VALUES (?1, 'q', 'a', ?2)",
                    params![id, now()],
                )?;
                Ok(())
            })
            .expect("Failed to insert behind the store's back");

        assert_eq!(db.get_stats().expect("stats").total_chats, 1);
    }

    #[test]
    fn test_clear_all_data() {
        let (db, dir) = create_test_db();
        let uploads = dir.path().join("uploads");
        fs::create_dir_all(&uploads).expect("Failed to create uploads");
        let upload = uploads.join("notes.txt");
        fs::write(&upload, "notes").expect("Failed to write upload");

        let id = db.create_session(Some("Wipe me")).expect("create");
        let mut file = text_file(id, "notes.txt", "notes");
        file.path = upload.to_string_lossy().to_string();
        db.add_file(&file).expect("add");
        db.add_chat(id, "q", "a").expect("add");

        let report = db.clear_all_data();
        assert!(report.success, "Reset failed: {:?}", report.error);
        assert_eq!(report.removed_files, 1);
        assert!(report.failed_paths.is_empty());
        assert!(!upload.exists(), "Uploaded file should be deleted");
        assert!(uploads.is_dir(), "Uploads directory should be recreated");

        let stats = db.get_stats().expect("stats");
        assert_eq!(
            stats,
            Stats {
                total_sessions: 1,
                active_sessions: 1,
                total_files: 0,
                total_size: 0,
                total_chats: 0,
            }
        );
        let active = db.get_active_session().expect("get").expect("active");
        assert_eq!(active.name, DEFAULT_SESSION_NAME);
    }

    #[test]
    fn test_failed_clear_all_data_leaves_store_usable() {
        let (db, dir) = create_test_db();
        // A regular file where the uploads directory should be recreated
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "x").expect("write");
        let db = db.with_uploads_dir(blocker.join("uploads"));
        db.create_session(Some("Doomed")).expect("create");

        let report = db.clear_all_data();
        assert!(!report.success);
        assert!(report.error.is_some());

        let stats = db.get_stats().expect("Store should be usable after a failed reset");
        assert_eq!(stats.active_sessions, 1);
        let id = db.create_session(Some("After")).expect("create");
        assert_eq!(db.get_active_session().expect("get").expect("active").id, id);
    }

    #[test]
    fn test_clear_all_data_in_memory() {
        let db = Database::open_in_memory().expect("Failed to open");
        let id = db.create_session(Some("Temp")).expect("create");
        db.add_chat(id, "q", "a").expect("add");

        let report = db.clear_all_data();
        assert!(report.success);
        assert_eq!(db.get_stats().expect("stats").total_sessions, 1);
    }

    #[test]
    fn test_remove_database_files_ignores_missing() {
        let dir = tempdir().expect("Failed to create temp directory");
        let path = dir.path().join("gone.db");
        fs::write(&path, b"").expect("write");
        fs::write(dir.path().join("gone.db-wal"), b"").expect("write");

        remove_database_files(&path).expect("Failed to remove");
        assert!(!path.exists());
        assert!(!dir.path().join("gone.db-wal").exists());
    }
}
