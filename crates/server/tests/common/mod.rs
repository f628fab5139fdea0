//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port, backed by an in-process
//! gateway whose generator returns canned text, and a temp dir holding prompt
//! inputs.

#![allow(unused)]

use anyhow::Result;
use chatsql::providers::ai::local::LocalGateway;
use chatsql::AppConfig;
use chatsql_server::{serve, state::AppState};
use chatsql_test_utils::{StubGenerator, TestSetup};
use reqwest::Client;
use std::sync::Arc;
use tokio::{net::TcpListener, task::JoinHandle};

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub generator: StubGenerator,
    pub setup: TestSetup,
    _server_handle: JoinHandle<()>,
}

impl TestApp {
    /// Spawns the server with a generator that always answers `raw_output`.
    pub async fn spawn(raw_output: &str) -> Result<Self> {
        Self::spawn_with_config(raw_output, serde_json::json!({})).await
    }

    /// Same as `spawn`, with `overrides` merged into the written config.
    pub async fn spawn_with_config(raw_output: &str, overrides: serde_json::Value) -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let setup = TestSetup::new().await?;
        let config_path = setup.write_config(overrides)?;
        let config: AppConfig = chatsql::get_config(config_path.to_str())?;

        let generator = StubGenerator::new(raw_output);
        let gateway = LocalGateway::new(Arc::new(generator.clone()), config.max_new_tokens);
        let app_state = AppState::with_gateway(Box::new(gateway), &config)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = format!("http://{}", listener.local_addr()?);
        let server_handle = tokio::spawn(async move {
            if let Err(e) = serve(listener, app_state).await {
                eprintln!("Server error during test: {e}");
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            generator,
            setup,
            _server_handle: server_handle,
        })
    }

    /// A request body pointing at this app's prompt inputs.
    pub fn generate_body(&self, question: &str) -> serde_json::Value {
        serde_json::json!({
            "question": question,
            "examples": "",
            "prompt_file": self.setup.prompt_file(),
            "metadata_file": self.setup.metadata_file(),
        })
    }
}
