use anyhow::Result;
use async_trait::async_trait;
use chatsql::errors::GatewayError;
use chatsql::prompts::templates::{DEFAULT_PROMPT_TEMPLATE, DEFAULT_TABLE_METADATA};
use chatsql::providers::ai::generation::TextGenerator;
use chatsql::providers::ai::{GenerationRequest, InferenceGateway};
use chatsql::providers::db::execute_batch;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Three users, matching `DEFAULT_TABLE_METADATA`.
pub const USERS_FIXTURE_SQL: &str = "
CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
INSERT INTO users (id, name, email) VALUES (1, 'Alice', 'alice@example.com');
INSERT INTO users (id, name, email) VALUES (2, 'Bob', 'bob@example.com');
INSERT INTO users (id, name, email) VALUES (3, 'Carol', NULL);
";

// --- Test Setup ---

/// A temporary working directory with a prompt template, table metadata, a
/// seeded database and a path for the example log.
pub struct TestSetup {
    pub dir: TempDir,
}

impl TestSetup {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("prompt.md"), DEFAULT_PROMPT_TEMPLATE)?;
        std::fs::write(dir.path().join("metadata.sql"), DEFAULT_TABLE_METADATA)?;
        let setup = Self { dir };
        execute_batch(&setup.db_path(), USERS_FIXTURE_SQL).await?;
        Ok(setup)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    pub fn prompt_file(&self) -> String {
        self.file("prompt.md")
    }

    pub fn metadata_file(&self) -> String {
        self.file("metadata.sql")
    }

    pub fn db_path(&self) -> String {
        self.file("users.db")
    }

    pub fn example_log_path(&self) -> String {
        self.file("fewshots_examples.txt")
    }

    /// Writes a JSON config pointing at this directory and returns its path.
    ///
    /// Keys in `overrides` replace the defaults.
    pub fn write_config(&self, overrides: Value) -> Result<PathBuf> {
        let mut config = json!({
            "prompt_file": self.prompt_file(),
            "metadata_file": self.metadata_file(),
            "local_db_path": self.db_path(),
            "example_log_path": self.example_log_path(),
        });
        if let (Some(base), Value::Object(extra)) = (config.as_object_mut(), overrides) {
            base.extend(extra);
        }
        let path = self.dir.path().join("config.json");
        std::fs::write(&path, serde_json::to_string_pretty(&config)?)?;
        Ok(path)
    }
}

// --- Stub Generator ---

/// A `TextGenerator` that always returns the same text and records every prompt.
#[derive(Clone, Debug)]
pub struct StubGenerator {
    response: String,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl StubGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The prompts and token budgets seen so far.
    pub fn get_calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TextGenerator for StubGenerator {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_new_tokens));
        Ok(self.response.clone())
    }
}

// --- Mock Gateway ---

/// An `InferenceGateway` that replays queued outcomes and records requests.
///
/// Once the queue is empty it answers with a default query.
#[derive(Clone, Debug, Default)]
pub struct MockGateway {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, raw: &str) {
        self.responses.lock().unwrap().push_back(Ok(raw.to_string()));
    }

    /// Queues an inference failure with the given message.
    pub fn add_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn get_calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceGateway for MockGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(GatewayError::Inference(message)),
            None => Ok("SELECT 1;".to_string()),
        }
    }
}
