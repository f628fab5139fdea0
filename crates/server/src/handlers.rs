use super::{errors::AppError, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chatsql::GenerationRequest;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize, Deserialize, Debug)]
pub struct GenerateResponse {
    pub query: String,
}

/// The handler for the root (`/`) endpoint.
pub async fn root() -> &'static str {
    "chatsql server is running."
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

/// The handler for `/generate`: renders the caller's prompt files, runs the
/// model and returns the extracted query.
pub async fn generate_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(mut request) =
        payload.map_err(|rejection| AppError::Payload(rejection.body_text()))?;
    info!("Received generation request: '{}'", request.question);

    if request.max_new_tokens.is_none() {
        request.max_new_tokens = app_state.chat_client.max_new_tokens;
    }

    let query = app_state.chat_client.generate_sql(&request).await?;
    Ok(Json(GenerateResponse { query }))
}
