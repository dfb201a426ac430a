//! Output formatting utilities for CLI commands.

use clap::ValueEnum;

/// Output format options for CLI commands that print lists or records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default).
    #[default]
    Text,
    /// Machine-readable JSON output.
    Json,
}
