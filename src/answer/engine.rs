//! Completion engines that stream an answer fragment by fragment.
//!
//! The [`CompletionEngine`] trait is the seam between the question-answering
//! flow and the model runtime. [`OllamaEngine`] talks to a local Ollama
//! server; tests supply their own engine.

use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::AnswerError;
use crate::config::Config;

/// Timeout for establishing a connection (30 seconds).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the whole streamed generation (10 minutes).
///
/// Small local models on a CPU can take minutes on a large context.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// A lazily produced sequence of answer fragments.
pub type FragmentStream<'a> = Box<dyn Iterator<Item = Result<String, AnswerError>> + 'a>;

/// Something that can turn a prompt into a streamed answer.
pub trait CompletionEngine {
    /// Start generating an answer for `prompt`.
    ///
    /// Fragments are produced as the model emits them. The caller may stop
    /// iterating at any point.
    fn stream(&self, prompt: &str) -> Result<FragmentStream<'_>, AnswerError>;
}

// ==================== Ollama ====================

/// Ollama `/api/generate` client.
pub struct OllamaEngine {
    /// HTTP client instance.
    client: Client,
    /// Server base URL without trailing slash (e.g., "http://localhost:11434").
    base_url: String,
    /// Model name (e.g., "llama3.2:1b").
    model: String,
}

impl OllamaEngine {
    /// Creates an engine for the given server and model.
    pub fn new(base_url: &str, model: &str) -> Result<Self, AnswerError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Creates an engine from the configured server and model.
    pub fn from_config(config: &Config) -> Result<Self, AnswerError> {
        Self::new(&config.ollama_url, &config.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": true,
        })
    }
}

impl CompletionEngine for OllamaEngine {
    fn stream(&self, prompt: &str) -> Result<FragmentStream<'_>, AnswerError> {
        tracing::debug!("Requesting completion from {} ({})", self.base_url, self.model);

        let response = self
            .client
            .post(self.generate_url())
            .json(&self.build_request_body(prompt))
            .send()
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnswerError::HttpError {
                status: status_code,
                body: body_text,
            });
        }

        Ok(Box::new(NdjsonFragments::new(BufReader::new(response))))
    }
}

/// One line of Ollama's newline-delimited JSON stream.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

fn parse_chunk(line: &str) -> Result<GenerateChunk, AnswerError> {
    let chunk: GenerateChunk =
        serde_json::from_str(line).map_err(|e| AnswerError::ParseError(e.to_string()))?;
    match chunk.error {
        Some(message) => Err(AnswerError::ApiError(message)),
        None => Ok(chunk),
    }
}

/// Iterator over the `response` fields of an NDJSON body.
///
/// Ends after the chunk marked `done`, at end of input, or after the first
/// error.
struct NdjsonFragments<R: BufRead> {
    lines: Lines<R>,
    finished: bool,
}

impl<R: BufRead> NdjsonFragments<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for NdjsonFragments<R> {
    type Item = Result<String, AnswerError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(AnswerError::RequestFailed(e.to_string())));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_chunk(&line) {
                Ok(chunk) => {
                    self.finished = chunk.done;
                    if let Some(text) = chunk.response.filter(|t| !t.is_empty()) {
                        return Some(Ok(text));
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
