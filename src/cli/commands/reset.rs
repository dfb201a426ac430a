//! Reset command - delete the database and uploads without opening them.
//!
//! Useful when the database is damaged and cannot be opened. There is no
//! confirmation prompt.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::storage::db::remove_database_files;

/// Delete the database file and the uploads directory, then recreate an
/// empty uploads directory.
pub fn reset_data(db_path: &Path, uploads_dir: &Path) -> Result<()> {
    remove_database_files(db_path)?;

    if uploads_dir.exists() {
        fs::remove_dir_all(uploads_dir)
            .with_context(|| format!("Failed to delete {}", uploads_dir.display()))?;
    }
    fs::create_dir_all(uploads_dir)
        .with_context(|| format!("Failed to create {}", uploads_dir.display()))?;

    tracing::info!("Reset {} and {}", db_path.display(), uploads_dir.display());
    Ok(())
}

/// Executes the reset command.
pub fn run() -> Result<()> {
    let config = Config::load()?;
    let db_path = config.db_path()?;
    let uploads_dir = config.uploads_dir()?;

    reset_data(&db_path, &uploads_dir)?;

    println!("{} {}", "Deleted".green(), db_path.display());
    println!("{} {}", "Emptied".green(), uploads_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use tempfile::tempdir;

    #[test]
    fn test_reset_data_removes_everything() {
        let dir = tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("study_ai.db");
        let uploads = dir.path().join("uploads");

        {
            let db = Database::open(&db_path).expect("open");
            db.create_session(Some("Gone soon")).expect("create");
        }
        fs::create_dir_all(uploads.join("nested")).expect("mkdir");
        fs::write(uploads.join("a.txt"), "a").expect("write");

        reset_data(&db_path, &uploads).expect("Failed to reset");

        assert!(!db_path.exists());
        assert!(uploads.is_dir());
        assert_eq!(fs::read_dir(&uploads).expect("read dir").count(), 0);
    }

    #[test]
    fn test_reset_data_when_nothing_exists() {
        let dir = tempdir().expect("Failed to create temp directory");
        let uploads = dir.path().join("uploads");

        reset_data(&dir.path().join("missing.db"), &uploads).expect("Failed to reset");
        assert!(uploads.is_dir());
    }
}
