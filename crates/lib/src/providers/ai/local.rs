use super::generation::TextGenerator;
use super::{GenerationRequest, InferenceGateway};
use crate::{errors::GatewayError, prompts::load_prompt};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Runs a model inside this process.
///
/// The model is loaded once and shared by every clone of the gateway.
/// Generations are serialised: one runs at a time.
#[derive(Clone, Debug)]
pub struct LocalGateway {
    generator: Arc<dyn TextGenerator>,
    lock: Arc<Mutex<()>>,
    max_new_tokens: usize,
}

impl LocalGateway {
    /// Wraps a loaded generator. `max_new_tokens` applies when a request sets none.
    pub fn new(generator: Arc<dyn TextGenerator>, max_new_tokens: usize) -> Self {
        Self {
            generator,
            lock: Arc::new(Mutex::new(())),
            max_new_tokens,
        }
    }

    /// Loads the candle checkpoint at `model_path`.
    #[cfg(feature = "candle")]
    pub fn load(
        model_path: &str,
        num_beams: usize,
        max_new_tokens: usize,
    ) -> Result<Self, GatewayError> {
        let generator = super::generation::CandleGenerator::load(model_path, num_beams)?;
        Ok(Self::new(Arc::new(generator), max_new_tokens))
    }
}

#[async_trait]
impl InferenceGateway for LocalGateway {
    /// Renders the prompt from the request's files and runs the model on it.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let prompt = load_prompt(
            &request.prompt_file,
            &request.metadata_file,
            &request.question,
            &request.examples,
        )
        .await?;
        let max_new_tokens = request.max_new_tokens.unwrap_or(self.max_new_tokens);

        let _guard = self.lock.lock().await;
        info!("Generating up to {max_new_tokens} tokens locally.");
        let generator = Arc::clone(&self.generator);
        tokio::task::spawn_blocking(move || generator.generate(&prompt, max_new_tokens))
            .await
            .map_err(|e| GatewayError::Inference(format!("generation task failed: {e}")))?
    }
}
