use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The fallback scan of the deployment tree found fewer than two
    /// reference audio files.  Reported as a server-side error because it
    /// reflects deployment state, not the client's request.
    #[error("insufficient reference audio found")]
    InsufficientReferenceAudio,

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InsufficientReferenceAudio => {
                tracing::error!("no usable reference audio on disk");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "insufficient reference audio found".to_string(),
                )
            }
            ApiError::Synthesis(e) => {
                tracing::error!("synthesis error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Synthesis error: {e}"),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
