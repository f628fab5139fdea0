use crate::config::AppConfig;
use crate::constants::{DISPLAY_ROW_LIMIT, GREETINGS};
use crate::errors::{ChatError, ConfigError};
use crate::extract::{DelimiterExtractor, ExtractionStrategy};
use crate::providers::ai::InferenceGateway;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// --- Conversation ---

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The ordered messages of one chat session.
///
/// A transcript belongs to exactly one session and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session with a randomly chosen assistant greeting.
    pub fn with_greeting() -> Self {
        let greeting = GREETINGS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(GREETINGS[0]);
        let mut transcript = Self::new();
        transcript.push(Role::Assistant, greeting);
        transcript
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// --- Answers ---

/// How an answer is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Show the generated SQL.
    #[default]
    Code,
    /// Run the SQL and show the first rows of the result.
    Dataframe,
}

impl std::str::FromStr for AnswerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(AnswerMode::Code),
            "dataframe" => Ok(AnswerMode::Dataframe),
            other => Err(ConfigError::Invalid(format!(
                "answer_mode must be 'code' or 'dataframe', got '{other}'"
            ))),
        }
    }
}

/// Rows returned by a query, truncated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// At most `DISPLAY_ROW_LIMIT` rows.
    pub rows: Vec<Vec<Value>>,
    /// Number of rows the statement produced before truncation.
    pub total_rows: usize,
}

impl QueryResult {
    /// Builds a result, keeping only the first `DISPLAY_ROW_LIMIT` rows.
    pub fn truncated(columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let total_rows = rows.len();
        rows.truncate(DISPLAY_ROW_LIMIT);
        Self {
            columns,
            rows,
            total_rows,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }
}

/// Renders a JSON scalar the way a result table shows it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(display_value).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(name, width)| format!("{name:<width$}"))
            .collect();
        writeln!(f, "{}", header.join(" | ").trim_end())?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "{}", line.join(" | ").trim_end())?;
        }

        if self.is_truncated() {
            write!(f, "({} of {} rows shown)", self.rows.len(), self.total_rows)?;
        } else {
            write!(f, "({} rows)", self.total_rows)?;
        }
        Ok(())
    }
}

/// The outcome of one successful interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Answer {
    Code { sql: String },
    Table { sql: String, result: QueryResult },
}

impl Answer {
    /// The extracted SQL, which is what the transcript records in either mode.
    pub fn sql(&self) -> &str {
        match self {
            Answer::Code { sql } | Answer::Table { sql, .. } => sql,
        }
    }
}

// --- Client ---

/// Per-interaction options. Unset fields fall back to the client's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskOptions {
    pub question: String,
    #[serde(default)]
    pub examples: String,
    #[serde(default)]
    pub max_new_tokens: Option<usize>,
    #[serde(default)]
    pub answer_mode: Option<AnswerMode>,
}

/// Turns questions into SQL and, optionally, result rows.
pub struct ChatClient {
    pub gateway: Box<dyn InferenceGateway>,
    pub extractor: Box<dyn ExtractionStrategy>,
    pub prompt_file: String,
    pub metadata_file: String,
    pub db_path: String,
    pub answer_mode: AnswerMode,
    pub max_new_tokens: Option<usize>,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("gateway", &self.gateway)
            .field("prompt_file", &self.prompt_file)
            .field("metadata_file", &self.metadata_file)
            .field("db_path", &self.db_path)
            .field("answer_mode", &self.answer_mode)
            .finish_non_exhaustive()
    }
}

/// A builder for `ChatClient`.
#[derive(Default)]
pub struct ChatClientBuilder {
    gateway: Option<Box<dyn InferenceGateway>>,
    extractor: Option<Box<dyn ExtractionStrategy>>,
    prompt_file: Option<String>,
    metadata_file: Option<String>,
    db_path: Option<String>,
    answer_mode: AnswerMode,
    max_new_tokens: Option<usize>,
}

impl ChatClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds paths, answer mode and generation budget from the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            extractor: Some(config.extraction.build()),
            prompt_file: Some(config.prompt_file.clone()),
            metadata_file: Some(config.metadata_file.clone()),
            db_path: Some(config.local_db_path.clone()),
            answer_mode: config.answer_mode,
            max_new_tokens: Some(config.max_new_tokens),
            ..Self::default()
        }
    }

    pub fn gateway(mut self, gateway: Box<dyn InferenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn extractor(mut self, extractor: Box<dyn ExtractionStrategy>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn prompt_file(mut self, path: impl Into<String>) -> Self {
        self.prompt_file = Some(path.into());
        self
    }

    pub fn metadata_file(mut self, path: impl Into<String>) -> Self {
        self.metadata_file = Some(path.into());
        self
    }

    pub fn db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn answer_mode(mut self, mode: AnswerMode) -> Self {
        self.answer_mode = mode;
        self
    }

    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = Some(max_new_tokens);
        self
    }

    /// Builds the client. A gateway and both prompt inputs are required.
    pub fn build(self) -> Result<ChatClient, ChatError> {
        let gateway = self
            .gateway
            .ok_or_else(|| ConfigError::Invalid("an inference gateway is required".into()))?;
        let prompt_file = self
            .prompt_file
            .ok_or_else(|| ConfigError::Invalid("prompt_file is required".into()))?;
        let metadata_file = self
            .metadata_file
            .ok_or_else(|| ConfigError::Invalid("metadata_file is required".into()))?;

        Ok(ChatClient {
            gateway,
            extractor: self
                .extractor
                .unwrap_or_else(|| Box::new(DelimiterExtractor::default())),
            prompt_file,
            metadata_file,
            db_path: self
                .db_path
                .unwrap_or_else(|| crate::constants::DEFAULT_DB_FILE.to_string()),
            answer_mode: self.answer_mode,
            max_new_tokens: self.max_new_tokens,
        })
    }
}
