//! # Application State
//!
//! The state shared by all handlers: one `ChatClient` wrapping the in-process
//! gateway. Prompt and metadata paths come from each request, so the client's
//! own paths are only defaults.

use chatsql::{
    providers::{ai::InferenceGateway, factory::create_local_gateway},
    AppConfig, ChatClient, ChatClientBuilder,
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub chat_client: Arc<ChatClient>,
}

impl AppState {
    /// Wraps an existing gateway, using `config` for the extraction strategy and
    /// the server's generation budget.
    pub fn with_gateway(
        gateway: Box<dyn InferenceGateway>,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        let chat_client = ChatClientBuilder::from_config(config)
            .gateway(gateway)
            .max_new_tokens(config.server_max_new_tokens)
            .build()?;
        Ok(Self {
            chat_client: Arc::new(chat_client),
        })
    }
}

/// Loads the model and builds the shared state.
///
/// The server always runs inference itself; `inference` in the config only
/// matters to clients.
pub fn build_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    info!("Loading model for the inference server.");
    let gateway = create_local_gateway(config)?;
    AppState::with_gateway(gateway, config)
}
