//! Language-generation provider abstraction.

use crate::error::VoiceError;
use async_trait::async_trait;
use collab_types::ConversationTurn;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use tracing::{error, warn};

/// Incremental reply fragments, in arrival order. Finite and not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, VoiceError>> + Send>>;

/// Content categories a safety setting applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
}

/// Probability level at and above which content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockMediumAndAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// The fixed safety policy applied to every voice exchange.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    vec![SafetySetting {
        category: HarmCategory::Harassment,
        threshold: HarmBlockThreshold::BlockMediumAndAbove,
    }]
}

/// One generation call: the model, the full turn list and the safety policy.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub contents: Vec<ConversationTurn>,
    pub safety_settings: Vec<SafetySetting>,
}

/// A provider that turns a conversation into a text reply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider identifier used in logs (e.g. "gemini").
    fn id(&self) -> &'static str;

    /// Requests the completed reply in one response.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, VoiceError>;

    /// Opens an incremental reply.
    ///
    /// Errors returned here mean the request could not be started at all.
    /// Providers without incremental delivery keep the default, which yields
    /// the completed reply as a single fragment.
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream, VoiceError> {
        let text = self.complete(request).await?;
        Ok(Box::pin(futures_util::stream::once(async move { Ok(text) })))
    }
}

/// Drains the provider's fragments into the full reply.
///
/// A fault after the stream has opened triggers one blocking completion
/// call; if that fails too the reply is the empty string. Only a failure to
/// open the stream is returned as an error.
pub async fn drain_reply(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
) -> Result<String, VoiceError> {
    let mut fragments = generator.stream(request).await?;
    let mut text = String::new();

    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(fragment) => text.push_str(&fragment),
            Err(e) => {
                warn!(
                    provider = generator.id(),
                    error = %e,
                    received_bytes = text.len(),
                    "text stream faulted, falling back to a single completion"
                );
                drop(fragments);
                return Ok(match generator.complete(request).await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(
                            provider = generator.id(),
                            error = %e,
                            "could not extract text from stream or completion"
                        );
                        String::new()
                    }
                });
            }
        }
    }

    Ok(text)
}
