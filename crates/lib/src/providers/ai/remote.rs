use super::{GenerationRequest, InferenceGateway};
use crate::errors::GatewayError;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    query: String,
}

/// Delegates generation to a `chatsql-server` over HTTP.
#[derive(Clone, Debug)]
pub struct RemoteGateway {
    client: ReqwestClient,
    api_address: String,
}

impl RemoteGateway {
    /// Creates a gateway posting to `api_address` (the full `/generate` URL).
    pub fn new(api_address: String) -> Result<Self, GatewayError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(GatewayError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_address,
        })
    }
}

#[async_trait]
impl InferenceGateway for RemoteGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        info!("Requesting generation from {}", self.api_address);
        let response = self
            .client
            .post(&self.api_address)
            .json(request)
            .send()
            .await
            .map_err(GatewayError::Request)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(GatewayError::Request)?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Malformed(format!("{e}: {body}")))?;
        debug!(query = %parsed.query, "Remote generation finished");
        Ok(parsed.query)
    }
}
