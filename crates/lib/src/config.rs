//! # Application Configuration
//!
//! Configuration is read once at startup and layered:
//!
//! 1. built-in defaults,
//! 2. a config file (`config.json` unless overridden; JSON and YAML accepted),
//! 3. `CHATSQL_`-prefixed environment variables, with `__` separating nested keys
//!    (e.g. `CHATSQL_EXTRACTION__STRATEGY=code_fence`).

use crate::constants::*;
use crate::errors::ConfigError;
use crate::extract::{CodeFenceExtractor, DelimiterExtractor, ExtractionStrategy};
use crate::types::AnswerMode;
use config::{Config as ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::{env, path::Path};
use tracing::info;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CHATSQL_CONFIG";

/// Where inference runs.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    /// Load the model into this process.
    #[default]
    Local,
    /// Call a `chatsql-server` at `api_address`.
    Remote,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    #[default]
    Delimiter,
    CodeFence,
}

/// Selects and parameterises the SQL extraction strategy.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub strategy: ExtractionKind,
    #[serde(default = "default_terminator")]
    pub terminator: String,
    #[serde(default = "default_fence")]
    pub fence: String,
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_terminator() -> String {
    ";".to_string()
}
fn default_fence() -> String {
    "```".to_string()
}
fn default_label() -> String {
    ":".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionKind::default(),
            terminator: default_terminator(),
            fence: default_fence(),
            label: default_label(),
        }
    }
}

impl ExtractionConfig {
    pub fn build(&self) -> Box<dyn ExtractionStrategy> {
        let delimiters = DelimiterExtractor {
            terminator: self.terminator.clone(),
            fence: self.fence.clone(),
            label: self.label.clone(),
        };
        match self.strategy {
            ExtractionKind::Delimiter => Box::new(delimiters),
            ExtractionKind::CodeFence => Box::new(CodeFenceExtractor { delimiters }),
        }
    }
}

/// The root configuration structure.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Directory holding the model checkpoint (`config.json`, `tokenizer.json`, weights).
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Prompt template with `{user_question}`, `{examples}` and `{table_metadata_string}`.
    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,
    /// DDL describing the queried tables.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    #[serde(default = "default_db_path")]
    pub local_db_path: String,
    #[serde(default)]
    pub answer_mode: AnswerMode,
    /// Endpoint of the inference server, e.g. `http://localhost:8000/generate`.
    #[serde(default)]
    pub api_address: Option<String>,
    #[serde(default)]
    pub inference: InferenceMode,
    #[serde(default = "default_example_log_path")]
    pub example_log_path: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
    /// Budget `chatsql-server` applies to requests that carry none.
    #[serde(default = "default_server_max_new_tokens")]
    pub server_max_new_tokens: usize,
    #[serde(default = "default_num_beams")]
    pub num_beams: usize,
    /// Listening port of `chatsql-server`.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

fn default_model_path() -> String {
    DEFAULT_MODEL_PATH.to_string()
}
fn default_prompt_file() -> String {
    DEFAULT_PROMPT_FILE.to_string()
}
fn default_metadata_file() -> String {
    DEFAULT_METADATA_FILE.to_string()
}
fn default_db_path() -> String {
    DEFAULT_DB_FILE.to_string()
}
fn default_example_log_path() -> String {
    DEFAULT_EXAMPLE_LOG_FILE.to_string()
}
fn default_max_new_tokens() -> usize {
    DEFAULT_MAX_NEW_TOKENS
}
fn default_server_max_new_tokens() -> usize {
    DEFAULT_SERVER_MAX_NEW_TOKENS
}
fn default_num_beams() -> usize {
    DEFAULT_NUM_BEAMS
}
fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

impl AppConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.inference == InferenceMode::Remote
            && self.api_address.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "api_address is required when inference is 'remote'".into(),
            ));
        }
        if self.num_beams == 0 {
            return Err(ConfigError::Invalid("num_beams must be at least 1".into()));
        }
        if self.max_new_tokens == 0 || self.server_max_new_tokens == 0 {
            return Err(ConfigError::Invalid(
                "max_new_tokens and server_max_new_tokens must be at least 1".into(),
            ));
        }
        if self.extraction.terminator.is_empty() {
            return Err(ConfigError::Invalid(
                "extraction.terminator must not be empty".into(),
            ));
        }
        Ok(self)
    }
}

/// Loads the configuration.
///
/// An explicit path (argument, then `CHATSQL_CONFIG`) must exist. Without one,
/// `config.json` in the working directory is used when present.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let explicit_path = config_path_override
        .map(str::to_string)
        .or_else(|| env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.is_empty()));

    let mut builder = ConfigBuilder::builder();
    match explicit_path {
        Some(path) => {
            if !Path::new(&path).exists() {
                return Err(ConfigError::NotFound(path));
            }
            info!("Loading configuration from '{path}'.");
            builder = builder.add_source(File::from(Path::new(&path)));
        }
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Loading configuration from '{DEFAULT_CONFIG_FILE}'.");
            } else {
                info!("No '{DEFAULT_CONFIG_FILE}' found, using defaults and environment.");
            }
            builder = builder.add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false));
        }
    }

    let settings = builder
        .add_source(
            Environment::with_prefix("CHATSQL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()
}
