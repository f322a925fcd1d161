//! Speech-synthesis provider abstraction.

use crate::error::VoiceError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;

/// Encoded audio chunks, in arrival order. Finite and not restartable.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, VoiceError>> + Send>>;

/// Voice used for every reply.
pub const VOICE_ID: &str = "CaJslL1xziwefCeTNzHv";

/// Synthesis model used for every reply.
pub const MODEL_ID: &str = "eleven_multilingual_v2";

/// Output encodings the service can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// MP3 at 44.1 kHz, 128 kbps.
    #[default]
    Mp3,
}

impl OutputFormat {
    /// Provider query value for this format.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3_44100_128",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: OutputFormat,
}

impl SpeechRequest {
    /// A request using the fixed voice, model and output format.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: VOICE_ID.to_string(),
            model_id: MODEL_ID.to_string(),
            output_format: OutputFormat::default(),
        }
    }
}

/// A provider that turns text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider identifier used in logs (e.g. "elevenlabs").
    fn id(&self) -> &'static str;

    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioStream, VoiceError>;
}

/// Concatenates every chunk, in order, into one buffer.
pub async fn collect_audio(mut chunks: AudioStream) -> Result<Vec<u8>, VoiceError> {
    let mut audio = Vec::new();
    while let Some(chunk) = chunks.next().await {
        audio.extend_from_slice(&chunk?);
    }
    Ok(audio)
}
