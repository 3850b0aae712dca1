pub mod config;
pub mod error;
pub mod shape;
pub mod stream;
pub mod validation;

use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use firered_core::{DialogueModel, DialogueRequest, Waveform};

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Shared state for both service variants: the loaded model behind its trait
/// object plus the environment-derived configuration.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn DialogueModel>,
    pub config: ServerConfig,
}

/// Liveness probe.
pub async fn health_check() -> &'static str {
    "ok"
}

/// Runs one blocking model invocation off the async runtime.  Inference
/// serializes inside the engine, so concurrent requests queue here.
pub(crate) async fn run_synthesis(
    model: Arc<dyn DialogueModel>,
    request: DialogueRequest,
) -> Result<Waveform, ApiError> {
    tokio::task::spawn_blocking(move || model.generate_dialogue(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("synthesis task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Tags each request and its response with an `x-request-id` header for log
/// correlation.
pub(crate) async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request
        .headers_mut()
        .insert("x-request-id", HeaderValue::from_str(&request_id).unwrap());
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert("x-request-id", HeaderValue::from_str(&request_id).unwrap());
    response
}
