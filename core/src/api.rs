// HTTP API for the text-to-speech relay
//
// Routing, handlers, and the mapping from the core error taxonomy onto
// response status codes.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::pipeline::{SynthesisPipeline, SynthesisRequest};
use crate::store::AudioStore;
use crate::ParrotError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SynthesisPipeline>,
    pub store: Arc<AudioStore>,
}

/// Handler-boundary error wrapper
///
/// Invalid input maps to 400 and a missing file to 404; every other failure
/// kind (provider, resolver, storage, IO) collapses to 500 with the
/// underlying message preserved in the body.
pub struct ApiError(ParrotError);

impl From<ParrotError> for ApiError {
    fn from(e: ParrotError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ParrotError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ParrotError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/tts", post(tts_handler))
        .route("/tts/download", post(tts_download_handler))
        .route("/download/:file_id", get(download_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Service metadata
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Text-to-Speech API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /tts": "Convert text to speech",
            "POST /tts/download": "Convert text to speech and download the audio",
            "GET /download/{id}": "Download previously generated audio",
            "GET /health": "Health check",
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "message": "API is running" }))
}

#[derive(Serialize)]
struct TtsResponse {
    message: String,
    file_id: String,
    file_path: String,
}

async fn tts_handler(
    State(state): State<AppState>,
    Json(req): Json<SynthesisRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    let audio = state.pipeline.synthesize(&req).await?;
    Ok(Json(TtsResponse {
        message: "Audio generated successfully".to_string(),
        file_id: audio.id,
        file_path: audio.path.to_string_lossy().to_string(),
    }))
}

async fn tts_download_handler(
    State(state): State<AppState>,
    Json(req): Json<SynthesisRequest>,
) -> Result<Response, ApiError> {
    let audio = state.pipeline.synthesize(&req).await?;
    let bytes = tokio::fs::read(&audio.path)
        .await
        .map_err(ParrotError::from)?;
    let filename = format!("speech_{}.mp3", audio.id);
    // The file starts expiring once the response is on its way out
    state.store.schedule_delete(audio.path.clone());
    info!(target: "api", id = %audio.id, "Serving synthesized audio for download");
    Ok(audio_response(audio.media_type, &filename, bytes))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.store.get(&file_id)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        // Deleted between the existence check and the read
        std::io::ErrorKind::NotFound => ParrotError::NotFound(file_id.clone()),
        _ => ParrotError::from(e),
    })?;
    let filename = format!("{file_id}.mp3");
    state.store.schedule_delete(path);
    Ok(audio_response("audio/mpeg", &filename, bytes))
}

fn audio_response(media_type: &str, filename: &str, bytes: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(media_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (StatusCode::OK, headers, bytes).into_response()
}
