pub mod generation;
pub mod local;
pub mod remote;

use crate::errors::GatewayError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Everything needed to turn one question into raw model output.
///
/// The serialized form is the wire body of `POST /generate`. `max_new_tokens`
/// is a local knob and is not sent to a remote server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub question: String,
    #[serde(default)]
    pub examples: String,
    pub prompt_file: String,
    pub metadata_file: String,
    #[serde(default, skip_serializing)]
    pub max_new_tokens: Option<usize>,
}

/// A trait for producing SQL-bearing text from a question.
///
/// Implementations either run the model in-process or delegate to an inference
/// server. Callers pass the result through an extraction strategy.
#[async_trait]
pub trait InferenceGateway: Send + Sync + Debug + DynClone {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError>;
}

dyn_clone::clone_trait_object!(InferenceGateway);
