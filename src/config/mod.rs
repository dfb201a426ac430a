//! Configuration management
//!
//! Settings live in `~/.study-ai/config.yaml`. A missing file means
//! defaults. A few keys can be overridden from the environment, which is
//! also how tests point the binary at a temporary data directory.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Default Ollama model used for answering questions.
pub const DEFAULT_MODEL: &str = "llama3.2:1b";

/// Default address of the local Ollama server.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Keys accepted by `study-ai config get/set`.
pub const CONFIG_KEYS: &[&str] = &[
    "data_dir",
    "model",
    "ollama_url",
    "session_list_limit",
    "chat_history_limit",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the database and uploads live (default: ~/.study-ai/data)
    pub data_dir: Option<PathBuf>,

    /// Model name passed to Ollama
    pub model: String,

    /// Base URL of the Ollama server
    pub ollama_url: String,

    /// How many sessions `session list` shows by default
    pub session_list_limit: usize,

    /// How many chat turns `history` shows by default
    pub chat_history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            session_list_limit: 20,
            chat_history_limit: 50,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    ///
    /// - `STUDY_AI_DATA_DIR` overrides `data_dir`
    /// - `STUDY_AI_MODEL` overrides `model`
    /// - `STUDY_AI_OLLAMA_URL` overrides `ollama_url`
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;

        if let Ok(dir) = env::var("STUDY_AI_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(model) = env::var("STUDY_AI_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        if let Ok(url) = env::var("STUDY_AI_OLLAMA_URL") {
            if !url.is_empty() {
                config.ollama_url = url;
            }
        }

        Ok(config)
    }

    /// Load only the config file, without environment overrides.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(text).map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Write the config file, creating `~/.study-ai` if needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_saphyr::to_string(self).map_err(|e| anyhow::anyhow!("{e}"))?;
        fs::write(&path, yaml).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
            .join(".study-ai");

        Ok(config_dir.join("config.yaml"))
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
                .join(".study-ai")
                .join("data")),
        }
    }

    /// `<data_dir>/study_ai.db`
    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("study_ai.db"))
    }

    /// `<data_dir>/uploads`
    pub fn uploads_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("uploads"))
    }

    /// Read a single key as a display string.
    pub fn get(&self, key: &str) -> Result<String> {
        Ok(match key {
            "data_dir" => self.data_dir()?.display().to_string(),
            "model" => self.model.clone(),
            "ollama_url" => self.ollama_url.clone(),
            "session_list_limit" => self.session_list_limit.to_string(),
            "chat_history_limit" => self.chat_history_limit.to_string(),
            other => bail!(
                "Unknown config key '{}'. Expected one of: {}",
                other,
                CONFIG_KEYS.join(", ")
            ),
        })
    }

    /// Set a single key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "model" => self.model = value.to_string(),
            "ollama_url" => self.ollama_url = value.trim_end_matches('/').to_string(),
            "session_list_limit" => {
                self.session_list_limit = value
                    .parse()
                    .with_context(|| format!("'{value}' is not a valid number"))?
            }
            "chat_history_limit" => {
                self.chat_history_limit = value
                    .parse()
                    .with_context(|| format!("'{value}' is not a valid number"))?
            }
            other => bail!(
                "Unknown config key '{}'. Expected one of: {}",
                other,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}
