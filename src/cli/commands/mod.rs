//! CLI commands for Study AI.
//!
//! Each submodule implements a single CLI command with its argument
//! parsing and execution logic.

/// Ask a question about the active session's material.
pub mod ask;

/// Wipe the database and uploads, then start fresh.
pub mod clear;

/// Shell completion script generation.
pub mod completions;

/// Configuration viewing and management.
pub mod config;

/// Export a session as JSON.
pub mod export;

/// List, inspect and delete uploaded files.
pub mod files;

/// Show previous questions and answers.
pub mod history;

/// Delete the data directory contents without opening the database.
pub mod reset;

/// Create, list, switch and delete sessions.
pub mod session;

/// Show aggregate counts.
pub mod stats;

/// Show the active session and environment.
pub mod status;

/// Upload documents into the active session.
pub mod upload;
