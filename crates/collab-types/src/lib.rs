//! Shared wire types for the CollabCopilot voice service.
//!
//! This crate holds the request and response envelopes of the `/api/voice`
//! endpoint and the conversation turn model exchanged with the language
//! provider. It has no I/O and no async code so both the server and the
//! provider layer can depend on it.

use serde::{Deserialize, Serialize};

pub mod voice;

pub use voice::{parse_context, ContextError, ConversationTurn, InlineData, Part, Role};

/// Request body of `POST /api/voice`.
///
/// Every field is optional at the serde level so that missing fields surface
/// as a validation error with a readable message instead of a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceRequest {
    /// Base64 audio payload, without the `data:` URI prefix.
    pub audio_data: Option<String>,
    /// Container/codec of `audio_data`, e.g. `audio/webm;codecs=opus`.
    pub mime_type: Option<String>,
    /// JSON-encoded array of prior [`ConversationTurn`]s. Kept as a raw value
    /// so that a malformed one degrades to empty history instead of failing
    /// the whole body.
    pub context: Option<serde_json::Value>,
    /// Language model identifier.
    pub model: Option<String>,
}

impl VoiceRequest {
    /// Returns `(audio_data, mime_type)` when both are present and non-empty.
    pub fn audio(&self) -> Option<(&str, &str)> {
        let audio = self.audio_data.as_deref().filter(|s| !s.is_empty())?;
        let mime = self.mime_type.as_deref().filter(|s| !s.is_empty())?;
        Some((audio, mime))
    }

    /// The requested model, if one was given.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Response body of a successful `POST /api/voice`.
///
/// The two audio fields are either both set or both `null`; the constructors
/// are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceResponse {
    response_text: String,
    audio_base64: Option<String>,
    audio_mime_type: Option<String>,
}

impl VoiceResponse {
    /// A response without synthesized audio.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            audio_base64: None,
            audio_mime_type: None,
        }
    }

    /// A response carrying base64 audio of the given media type.
    pub fn with_audio(
        text: impl Into<String>,
        audio_base64: impl Into<String>,
        audio_mime_type: impl Into<String>,
    ) -> Self {
        Self {
            response_text: text.into(),
            audio_base64: Some(audio_base64.into()),
            audio_mime_type: Some(audio_mime_type.into()),
        }
    }

    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    pub fn audio_base64(&self) -> Option<&str> {
        self.audio_base64.as_deref()
    }

    pub fn audio_mime_type(&self) -> Option<&str> {
        self.audio_mime_type.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_keys() {
        let req: VoiceRequest = serde_json::from_str(
            r#"{
                "audioData": "AAAA",
                "mimeType": "audio/webm",
                "context": "[]",
                "model": "gemini-pro"
            }"#,
        )
        .unwrap();
        assert_eq!(req.audio(), Some(("AAAA", "audio/webm")));
        assert_eq!(req.context, Some(serde_json::json!("[]")));
        assert_eq!(req.model(), Some("gemini-pro"));
    }

    #[test]
    fn empty_fields_count_as_missing() {
        let req: VoiceRequest =
            serde_json::from_str(r#"{"audioData": "", "mimeType": "audio/webm"}"#).unwrap();
        assert_eq!(req.audio(), None);

        let req: VoiceRequest = serde_json::from_str(r#"{"audioData": "AAAA"}"#).unwrap();
        assert_eq!(req.audio(), None);

        let req: VoiceRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.audio(), None);
        assert_eq!(req.model(), None);
    }

    #[test]
    fn context_of_any_type_still_parses() {
        for context in [
            serde_json::json!(42),
            serde_json::json!({ "role": "user" }),
            serde_json::json!([{ "role": "model", "parts": [] }]),
        ] {
            let body = serde_json::json!({
                "audioData": "AAAA",
                "mimeType": "audio/webm",
                "context": context.clone()
            });
            let req: VoiceRequest = serde_json::from_value(body).unwrap();
            assert_eq!(req.context, Some(context));
            assert_eq!(req.audio(), Some(("AAAA", "audio/webm")));
        }
    }

    #[test]
    fn text_only_response_writes_explicit_nulls() {
        let json = serde_json::to_value(VoiceResponse::text_only("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "responseText": "hi",
                "audioBase64": null,
                "audioMimeType": null
            })
        );
    }

    #[test]
    fn audio_response_sets_both_fields() {
        let resp = VoiceResponse::with_audio("hi", "SUQz", "audio/mpeg");
        assert_eq!(resp.audio_base64(), Some("SUQz"));
        assert_eq!(resp.audio_mime_type(), Some("audio/mpeg"));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["audioBase64"], "SUQz");
        assert_eq!(json["audioMimeType"], "audio/mpeg");
    }
}
