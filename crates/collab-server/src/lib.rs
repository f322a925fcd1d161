//! CollabCopilot server library logic.

pub mod api;
pub mod api_voice;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Extension, Json, Router,
};
use collab_voice::{ProviderConfig, SpeechSynthesizer, TextGenerator, VoiceError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
///
/// Immutable after startup. A provider is `None` when its API key is not
/// configured; the voice handler reports that per request.
#[derive(Clone)]
pub struct AppState {
    /// Language-generation provider (Gemini).
    pub generator: Option<Arc<dyn TextGenerator>>,
    /// Speech-synthesis provider (ElevenLabs).
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    /// Model used when a request does not name one.
    pub default_model: String,
    /// Deadline for the synthesis phase of one request.
    pub synthesis_timeout: Duration,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Builds provider clients from configuration.
    pub fn from_config(
        providers: &ProviderConfig,
        max_body_bytes: usize,
    ) -> Result<Self, VoiceError> {
        Ok(Self {
            generator: providers.text_generator()?,
            synthesizer: providers.speech_synthesizer()?,
            default_model: providers.default_model.clone(),
            synthesis_timeout: providers.synthesis_timeout(),
            max_body_bytes,
        })
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/voice", any(api_voice::voice_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
