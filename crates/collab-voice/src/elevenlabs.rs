//! ElevenLabs text-to-speech client.

use crate::error::VoiceError;
use crate::synthesis::{AudioStream, SpeechRequest, SpeechSynthesizer};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: Secret<String>,
    base_url: String,
}

impl fmt::Debug for ElevenLabsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl ElevenLabsClient {
    pub fn new(api_key: Secret<String>, base_url: impl Into<String>) -> Result<Self, VoiceError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    fn id(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioStream, VoiceError> {
        let format = request.output_format;
        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url,
            request.voice_id,
            format.as_param()
        );

        debug!(
            voice_id = %request.voice_id,
            model_id = %request.model_id,
            chars = request.text.chars().count(),
            "elevenlabs request"
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, format.mime_type())
            .json(&TtsRequest {
                text: &request.text,
                model_id: &request.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "elevenlabs API error");
            return Err(VoiceError::Synthesis(format!(
                "ElevenLabs TTS request failed: {status} - {body}"
            )));
        }

        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(VoiceError::from)),
        ))
    }
}
