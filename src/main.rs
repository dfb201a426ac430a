use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod answer;
mod cli;
mod config;
mod extract;
mod ingest;
mod storage;

use cli::commands;

/// The main CLI command line interface.
#[derive(Parser)]
#[command(name = "study-ai")]
#[command(version)]
#[command(about = "Ask questions about your own study material")]
#[command(long_about = "Study AI answers questions using only the documents you upload.\n\n\
    Documents (PDF, TXT, DOCX) are grouped into sessions. Questions are\n\
    answered by a local Ollama model from the active session's material,\n\
    and every answer is kept in the session's history.")]
#[command(after_help = "EXAMPLES:\n    \
    study-ai session new \"Biology\"         Start a new session\n    \
    study-ai upload notes.pdf              Add study material\n    \
    study-ai ask \"What is osmosis?\"        Ask about it\n    \
    study-ai history                       Review earlier answers\n    \
    study-ai session list                  List sessions\n\n\
    For more information about a command, run 'study-ai <command> --help'.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show the active session and environment
    Status,

    /// Create, list, switch and delete sessions
    #[command(long_about = "Manages study sessions. Exactly one session is active at a time;\n\
        uploads and questions go to it by default. Deleting a session also\n\
        deletes its files and chat history.")]
    Session(commands::session::Args),

    /// Upload documents into the active session
    #[command(long_about = "Copies documents into the data directory, extracts their text,\n\
        and adds them to the active session. Supports PDF, TXT and DOCX.")]
    Upload(commands::upload::Args),

    /// List, inspect and delete uploaded files
    Files(commands::files::Args),

    /// Ask a question about the session's material
    #[command(long_about = "Sends the question together with the session's extracted text to\n\
        the configured Ollama model and streams the answer. The model is told\n\
        to answer only from the uploaded material.")]
    Ask(commands::ask::Args),

    /// Show previous questions and answers
    History(commands::history::Args),

    /// Show totals across all sessions
    Stats(commands::stats::Args),

    /// Export a session as JSON
    Export(commands::export::Args),

    /// Delete all sessions, files and questions
    Clear(commands::clear::Args),

    /// Delete the database and uploads directory without opening them
    #[command(long_about = "Deletes the database file and the uploads directory, then creates\n\
        an empty uploads directory. Runs without confirmation and works even\n\
        when the database cannot be opened.")]
    Reset,

    /// View and manage configuration settings
    #[command(long_about = "Provides subcommands to show, get, and set configuration values.\n\
        Configuration is stored in ~/.study-ai/config.yaml.")]
    Config(commands::config::Args),

    /// Generate shell completion scripts
    Completions(commands::completions::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "study_ai=debug"
    } else {
        "study_ai=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Status => commands::status::run(),
        Commands::Session(args) => commands::session::run(args),
        Commands::Upload(args) => commands::upload::run(args),
        Commands::Files(args) => commands::files::run(args),
        Commands::Ask(args) => commands::ask::run(args),
        Commands::History(args) => commands::history::run(args),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Clear(args) => commands::clear::run(args),
        Commands::Reset => commands::reset::run(),
        Commands::Config(args) => commands::config::run(args),
        Commands::Completions(args) => {
            commands::completions::generate_completions(&mut Cli::command(), args.shell);
            Ok(())
        }
    }
}
