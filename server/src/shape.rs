//! Shape-reporting service: takes the full synthesis request as JSON and
//! returns the output tensor geometry instead of the audio itself.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use firered_core::{DialogueRequest, SAMPLE_RATE};

use crate::error::ApiError;
use crate::validation::validate_generate_request;
use crate::{add_request_id, health_check, run_synthesis, AppState};

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub sample_rate: u32,
    pub wav_tensor_shape: Vec<i64>,
}

pub fn router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .into_inner();

    Router::new()
        .route("/generate", post(generate))
        .route("/health", get(health_check))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware)
        .with_state(state)
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<DialogueRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    validate_generate_request(&request.text_list, request.temperature, request.topk)?;

    info!(
        utterances = request.text_list.len(),
        prompts = request.prompt_wav_list.len(),
        "dialogue synthesis request"
    );

    let waveform = run_synthesis(state.model.clone(), request).await?;

    Ok(Json(GenerateResponse {
        sample_rate: SAMPLE_RATE,
        wav_tensor_shape: waveform.shape,
    }))
}
