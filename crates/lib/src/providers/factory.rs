//! # Gateway Factory
//!
//! Picks the inference gateway named by `inference` in the configuration. The
//! CLI and the server both go through here.

use crate::{
    config::{AppConfig, InferenceMode},
    errors::GatewayError,
    providers::ai::{remote::RemoteGateway, InferenceGateway},
};
use tracing::info;

/// Creates the gateway selected by `config.inference`.
///
/// Local mode loads the model, which may take a while; call this once per process.
pub fn create_gateway(config: &AppConfig) -> Result<Box<dyn InferenceGateway>, GatewayError> {
    match config.inference {
        InferenceMode::Remote => {
            let api_address = config
                .api_address
                .clone()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    GatewayError::Unavailable(
                        "api_address must be set to use remote inference".to_string(),
                    )
                })?;
            info!("Using remote inference at {api_address}");
            Ok(Box::new(RemoteGateway::new(api_address)?))
        }
        InferenceMode::Local => create_local_gateway(config),
    }
}

/// Loads the in-process model named by `config.model_path`.
#[cfg(feature = "candle")]
pub fn create_local_gateway(config: &AppConfig) -> Result<Box<dyn InferenceGateway>, GatewayError> {
    use crate::providers::ai::local::LocalGateway;

    info!(
        "Loading local model from '{}' (beams: {}).",
        config.model_path, config.num_beams
    );
    Ok(Box::new(LocalGateway::load(
        &config.model_path,
        config.num_beams,
        config.max_new_tokens,
    )?))
}

#[cfg(not(feature = "candle"))]
pub fn create_local_gateway(_config: &AppConfig) -> Result<Box<dyn InferenceGateway>, GatewayError> {
    Err(GatewayError::Unavailable(
        "this build has no model backend; enable the `candle` feature or use inference = \"remote\""
            .to_string(),
    ))
}
