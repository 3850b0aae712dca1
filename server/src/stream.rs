//! Streaming service: takes the script plus reference audio uploads as
//! multipart form data and streams the synthesized WAV back.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use firered_core::{distinct_speaker_tags, encode_wav, DialogueRequest, SAMPLE_RATE};

use crate::error::ApiError;
use crate::validation::validate_generate_request;
use crate::{add_request_id, health_check, run_synthesis, AppState};

/// Transcripts substituted when a request carries none.  They pair with the
/// first two reference audio files in list order.
pub const PLACEHOLDER_PROMPT_TEXTS: [&str; 2] = [
    "[S1]This is the first reference speaker.",
    "[S2]This is the second reference speaker.",
];

const STREAM_CHUNK_BYTES: usize = 64 * 1024;

/// JSON carried in the `request` part of the multipart form.  Reference
/// audio arrives as file parts, so there is no path list here.
#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    pub text_list: Vec<String>,
    #[serde(default)]
    pub prompt_text_list: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_topk")]
    pub topk: i64,
}

fn default_temperature() -> f32 {
    firered_core::DEFAULT_TEMPERATURE
}

fn default_topk() -> i64 {
    firered_core::DEFAULT_TOPK
}

pub fn router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .into_inner();

    Router::new()
        .route("/generate", post(generate))
        .route("/health", get(health_check))
        // Reference audio uploads can be large, so the default 2 MB body
        // cap does not apply here.
        .layer(DefaultBodyLimit::disable())
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware)
        .with_state(state)
}

async fn generate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut request: Option<StreamRequest> = None;
    let mut uploads: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "request" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::InvalidInput(format!("unreadable 'request' part: {e}"))
                })?;
                request = Some(serde_json::from_str(&text).map_err(|e| {
                    ApiError::InvalidInput(format!("invalid 'request' JSON: {e}"))
                })?);
            }
            "speaker_wavs" => {
                let file_name = field.file_name().map(str::to_string).ok_or_else(|| {
                    ApiError::InvalidInput("speaker_wavs part has no filename".to_string())
                })?;
                let data = field.bytes().await.map_err(|e| {
                    ApiError::InvalidInput(format!("unreadable 'speaker_wavs' part: {e}"))
                })?;
                uploads.push((file_name, data));
            }
            _ => {}
        }
    }

    let request =
        request.ok_or_else(|| ApiError::InvalidInput("missing 'request' part".to_string()))?;
    validate_generate_request(&request.text_list, request.temperature, request.topk)?;

    let prompt_wav_list = if uploads.is_empty() {
        let speakers = distinct_speaker_tags(&request.text_list);
        fallback_prompt_wavs(&state.config.prompt_scan_dir, speakers.len())?
    } else {
        persist_uploads(&state.config.upload_dir, uploads).await?
    };

    let prompt_text_list = if request.prompt_text_list.is_empty() {
        PLACEHOLDER_PROMPT_TEXTS
            .iter()
            .map(|text| text.to_string())
            .collect()
    } else {
        request.prompt_text_list
    };

    info!(
        utterances = request.text_list.len(),
        prompts = prompt_wav_list.len(),
        "dialogue synthesis request"
    );

    let request = DialogueRequest {
        text_list: request.text_list,
        prompt_wav_list,
        prompt_text_list,
        temperature: request.temperature,
        topk: request.topk,
    };
    let waveform = run_synthesis(state.model.clone(), request).await?;

    let wav = encode_wav(&waveform.samples, SAMPLE_RATE)?;
    let chunks: Vec<Result<Bytes, Infallible>> = wav
        .chunks(STREAM_CHUNK_BYTES)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    let body = Body::from_stream(futures_util::stream::iter(chunks));

    Ok(([(header::CONTENT_TYPE, "audio/wav")], body).into_response())
}

/// Writes each upload into the upload directory under its original filename
/// and returns the resulting paths in upload order.  Existing files are
/// overwritten and nothing is cleaned up afterwards.
async fn persist_uploads(
    upload_dir: &Path,
    uploads: Vec<(String, Bytes)>,
) -> Result<Vec<String>, ApiError> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to create upload directory: {e}")))?;

    let mut paths = Vec::with_capacity(uploads.len());
    for (file_name, data) in uploads {
        let path = upload_dir.join(&file_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to persist upload {file_name}: {e}")))?;
        paths.push(path.to_string_lossy().into_owned());
    }
    Ok(paths)
}

/// Picks reference audio from the deployment tree when the request uploads
/// none: every `.wav` under the scan root, sorted by path, one file per
/// distinct speaker tag.  Fewer than two files on disk means the deployment
/// cannot voice a dialogue at all.
fn fallback_prompt_wavs(scan_dir: &Path, speaker_count: usize) -> Result<Vec<String>, ApiError> {
    let mut found = Vec::new();
    collect_wav_files(scan_dir, &mut found).map_err(|e| {
        ApiError::Internal(format!(
            "failed to scan {} for reference audio: {e}",
            scan_dir.display()
        ))
    })?;
    found.sort();

    if found.len() < 2 {
        return Err(ApiError::InsufficientReferenceAudio);
    }

    Ok(found
        .into_iter()
        .take(speaker_count)
        .map(|path| path.to_string_lossy().into_owned())
        .collect())
}

fn collect_wav_files(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_wav_files(&path, found)?;
        } else if path.extension().map(|ext| ext == "wav").unwrap_or(false) {
            found.push(path);
        }
    }
    Ok(())
}
