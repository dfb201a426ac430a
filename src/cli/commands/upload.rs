//! Upload command - add documents to the active session.
//!
//! Each file is copied into the uploads directory, its text is extracted,
//! and it is recorded against the active session. A file whose text
//! cannot be extracted is still uploaded; it just contributes nothing to
//! answers.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::Config;
use crate::extract::{DocumentExtractor, Extraction};
use crate::ingest::process_upload;
use crate::storage::Database;

/// Arguments for the upload command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    study-ai upload notes.pdf                Upload one document\n    \
    study-ai upload ch1.docx ch2.docx *.txt  Upload several documents\n\n\
Supported formats: PDF, TXT and DOCX.")]
pub struct Args {
    /// Documents to upload
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Executes the upload command.
pub fn run(args: Args) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open_default()?;
    let uploads_dir = match db.uploads_dir() {
        Some(dir) => dir.to_path_buf(),
        None => config.uploads_dir()?,
    };

    let mut failed = 0;
    for source in &args.files {
        match process_upload(&db, &DocumentExtractor, &uploads_dir, source) {
            Ok(outcome) => match &outcome.extraction {
                Extraction::Text(text) => {
                    println!(
                        "{} {} ({} characters)",
                        "Uploaded".green(),
                        outcome.filename.cyan(),
                        text.chars().count()
                    );
                }
                Extraction::Failed(e) => {
                    println!(
                        "{} {} {}",
                        "Uploaded".yellow(),
                        outcome.filename.cyan(),
                        format!("but no text could be read: {e}").yellow()
                    );
                }
            },
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {:#}", "Failed".red(), source.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files could not be uploaded", args.files.len());
    }
    Ok(())
}
