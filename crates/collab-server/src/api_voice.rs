//! `/api/voice`: one spoken turn in, text plus synthesized speech out.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension, Json},
    http::{Method, StatusCode},
};
use collab_types::{VoiceRequest, VoiceResponse};
use collab_voice::{ExchangeInput, VoiceExchange};
use std::sync::Arc;

/// Handler for `/api/voice`.
///
/// Mounted for every method so that non-POST requests get a JSON 405 rather
/// than the router's empty one. Validation runs in a fixed order (method,
/// credentials, body) and finishes before any provider is contacted. A body
/// read failure, including the size limit, is reported only after the method
/// and credential checks pass.
pub async fn voice_handler(
    method: Method,
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<VoiceResponse>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed {
            method,
            allow: "POST",
        });
    }

    let Some(generator) = state.generator.clone() else {
        tracing::error!("GEMINI_API_KEY not set in configuration or environment");
        return Err(ApiError::Configuration(
            "API key configuration error on server (Gemini).".to_string(),
        ));
    };
    let Some(synthesizer) = state.synthesizer.clone() else {
        tracing::error!("ELEVENLABS_API_KEY not set in configuration or environment");
        return Err(ApiError::Configuration(
            "API key configuration error on server (ElevenLabs).".to_string(),
        ));
    };

    let body = body.map_err(|rejection| {
        tracing::warn!(status = %rejection.status(), "failed to read request body");
        body_error(rejection, state.max_body_bytes)
    })?;

    let request: VoiceRequest = if body.iter().all(u8::is_ascii_whitespace) {
        VoiceRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };

    let input = ExchangeInput::from_request(&request).ok_or_else(|| {
        ApiError::BadRequest("Missing required audioData or mimeType in request body.".to_string())
    })?;

    let exchange = VoiceExchange::new(generator, synthesizer)
        .with_default_model(state.default_model.clone())
        .with_synthesis_timeout(state.synthesis_timeout);

    let response = exchange.respond(input).await.map_err(|e| {
        tracing::error!(error = %e, "voice exchange failed");
        ApiError::InternalServerError(format!("Failed to process request: {}", e))
    })?;

    tracing::info!(
        with_audio = response.audio_base64().is_some(),
        "sending voice response"
    );
    Ok(Json(response))
}

fn body_error(rejection: BytesRejection, max_body_bytes: usize) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!(
            "Request body exceeds the {} byte limit.",
            max_body_bytes
        ))
    } else {
        ApiError::BadRequest(format!(
            "Failed to read request body: {}",
            rejection.body_text()
        ))
    }
}
