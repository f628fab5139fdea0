//! # Text Generation
//!
//! The in-process half of inference: a `TextGenerator` turns a rendered prompt
//! into raw text. The default backend runs a Llama-family checkpoint with candle
//! and decodes with deterministic beam search.

pub mod beam;
#[cfg(feature = "candle")]
pub mod candle;

use crate::errors::GatewayError;
use std::fmt::Debug;

pub use beam::BeamSearch;
#[cfg(feature = "candle")]
pub use self::candle::CandleGenerator;

/// Produces raw text for a prompt. Implementations are blocking and may be slow.
pub trait TextGenerator: Send + Sync + Debug {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String, GatewayError>;
}

/// A step-wise language model, as seen by a search strategy.
pub trait Decoder {
    /// Whatever the model needs to continue a sequence (e.g. a KV cache).
    type State: Clone;

    /// Consumes the prompt and returns the logits for the first new token.
    fn prefill(&self, prompt: &[u32]) -> Result<(Self::State, Vec<f32>), GatewayError>;

    /// Appends `token` to the sequence held by `state` and returns the next logits.
    fn decode(&self, state: &mut Self::State, token: u32) -> Result<Vec<f32>, GatewayError>;
}
