//! Gemini `generateContent` client.
//!
//! Streams replies over the SSE variant of the API
//! (`streamGenerateContent?alt=sse`) and falls back to the unary
//! `generateContent` call through [`TextGenerator::complete`].

use crate::error::VoiceError;
use crate::generation::{GenerationRequest, SafetySetting, TextGenerator, TextStream};
use async_trait::async_trait;
use collab_types::ConversationTurn;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Secret<String>,
    base_url: Url,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: &'a [ConversationTurn],
    safety_settings: &'a [SafetySetting],
}

impl GeminiClient {
    /// `timeout` bounds each request from connect until the body is read.
    pub fn new(
        api_key: Secret<String>,
        base_url: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw)
            .map_err(|e| VoiceError::Config(format!("invalid Gemini base URL {raw:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(VoiceError::Config(format!(
                "Gemini base URL {raw:?} cannot carry a path"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// The model name is pushed as a single path segment, so `/`, `?` and `#`
    /// in it are percent-encoded and cannot leave `v1beta/models`.
    fn endpoint(&self, model: &str, method: &str) -> Url {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let resource = format!("{model}:{method}");
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1beta", "models", resource.as_str()]);
        }
        url
    }

    async fn post(
        &self,
        url: Url,
        request: &GenerationRequest,
    ) -> Result<reqwest::Response, VoiceError> {
        let body = GenerateContentBody {
            contents: &request.contents,
            safety_settings: &request.safety_settings,
        };

        debug!(
            model = %request.model,
            turns = request.contents.len(),
            "gemini request"
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "gemini API error");
            return Err(VoiceError::Generation(format!(
                "Gemini API error HTTP {status}: {body}"
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn id(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, VoiceError> {
        let url = self.endpoint(&request.model, "generateContent");
        let response: Value = self.post(url, request).await?.json().await?;
        trace!(response = %response, "gemini raw response");
        Ok(candidate_text(&response))
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream, VoiceError> {
        let mut url = self.endpoint(&request.model, "streamGenerateContent");
        url.set_query(Some("alt=sse"));
        let mut body = self.post(url, request).await?.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(VoiceError::Http(e));
                        return;
                    }
                };
                buf.extend(chunk.iter().filter(|b| **b != b'\r'));

                while let Some(pos) = find_event_end(&buf) {
                    let event: Vec<u8> = buf.drain(..pos + 2).collect();
                    for text in event_texts(&String::from_utf8_lossy(&event)) {
                        yield Ok(text);
                    }
                }
            }

            // A final event may arrive without the trailing blank line.
            for text in event_texts(&String::from_utf8_lossy(&buf)) {
                yield Ok(text);
            }
        }))
    }
}

/// Index of the `\n\n` that terminates the first complete SSE event.
fn find_event_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Reply text carried by one SSE event block.
fn event_texts(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<Value>(data.trim_start()).ok())
        .map(|event| candidate_text(&event))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Concatenated text parts of the first candidate.
fn candidate_text(response: &Value) -> String {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect()
        })
        .unwrap_or_default()
}
