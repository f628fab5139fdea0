#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared fixtures for the library's integration tests: a temporary working
//! directory with prompt inputs and a seeded database, plus a canned generator.

use chatsql::errors::GatewayError;
use chatsql::prompts::templates::{DEFAULT_PROMPT_TEMPLATE, DEFAULT_TABLE_METADATA};
use chatsql::providers::ai::generation::TextGenerator;
use chatsql::providers::db::execute_batch;
use dotenvy::dotenv;
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub const USERS_SQL: &str = "
CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
INSERT INTO users (id, name, email) VALUES (1, 'Alice', 'alice@example.com');
INSERT INTO users (id, name, email) VALUES (2, 'Bob', 'bob@example.com');
INSERT INTO users (id, name, email) VALUES (3, 'Carol', NULL);
";

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Writes the default prompt and metadata files into a fresh temp dir.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prompt.md"), DEFAULT_PROMPT_TEMPLATE).unwrap();
        std::fs::write(dir.path().join("metadata.sql"), DEFAULT_TABLE_METADATA).unwrap();
        Self { dir }
    }

    /// Same as `new`, plus a `users.db` holding three users.
    pub async fn with_users() -> Self {
        let ws = Self::new();
        execute_batch(&ws.db_path(), USERS_SQL).await.unwrap();
        ws
    }

    pub fn file(&self, name: &str) -> String {
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
}

/// Returns `response` for every prompt and keeps the prompts it was given.
#[derive(Debug, Clone)]
pub struct CannedGenerator {
    pub response: String,
    pub prompts: Arc<Mutex<Vec<(String, usize)>>>,
}

impl CannedGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TextGenerator for CannedGenerator {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String, GatewayError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_new_tokens));
        Ok(self.response.clone())
    }
}
