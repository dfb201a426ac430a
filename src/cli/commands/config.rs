//! Config command - manage configuration

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::config::{Config, CONFIG_KEYS};

#[derive(clap::Args)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
}

pub fn run(args: Args) -> Result<()> {
    match args.command {
        Some(ConfigCommand::Show) | None => show_config(),
        Some(ConfigCommand::Get { key }) => get_config(&key),
        Some(ConfigCommand::Set { key, value }) => set_config(&key, &value),
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Study AI Configuration".bold());
    println!();
    println!("  {}  {}", "File:".dimmed(), Config::config_path()?.display());
    println!("  {}  {}", "Database:".dimmed(), config.db_path()?.display());
    println!("  {}  {}", "Uploads:".dimmed(), config.uploads_dir()?.display());
    println!();

    for key in CONFIG_KEYS {
        println!("  {:<20}  {}", key.cyan(), config.get(key)?);
    }

    Ok(())
}

fn get_config(key: &str) -> Result<()> {
    let config = Config::load()?;
    println!("{}", config.get(key)?);
    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    // Environment overrides are not written back
    let mut config = Config::load_file()?;
    config.set(key, value)?;
    config.save()?;

    println!("{} {} = {}", "Set".green(), key.cyan(), config.get(key)?);
    Ok(())
}
