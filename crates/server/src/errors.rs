use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chatsql::ChatError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// Every failure answers `500` with `{"detail": "<message>"}` so clients can
/// show the original message.
pub enum AppError {
    /// Errors raised while generating a query.
    Chat(ChatError),
    /// The request body could not be read as a generation request.
    Payload(String),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::Chat(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = match self {
            AppError::Chat(err) => {
                error!("ChatError: {:?}", err);
                err.to_string()
            }
            AppError::Payload(message) => {
                error!("Rejected payload: {message}");
                message
            }
        };

        let body = Json(json!({ "detail": detail }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
