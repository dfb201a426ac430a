//! Study AI - ask questions about your own study material
//!
//! Upload lecture notes, papers and handouts into a session, then ask
//! questions that a locally running model answers using only that
//! material. Sessions, files and chat history live in a local SQLite
//! database.

pub mod answer;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod storage;
