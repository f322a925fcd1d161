//! Conversation turn definitions.
//!
//! A conversation is an ordered list of [`ConversationTurn`]s. The browser
//! keeps the history and sends it back with every voice request as a
//! JSON-encoded string; [`parse_context`] decodes that string.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person speaking to the assistant.
    User,
    /// The language model.
    Model,
}

/// Raw media embedded directly in a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// Media type of `data`, e.g. `audio/webm;codecs=opus`.
    pub mime_type: String,
    /// Base64 payload without a `data:` prefix.
    pub data: String,
}

/// One content unit of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Plain text.
    Text { text: String },
    /// Inline media (audio for this service).
    InlineData {
        #[serde(rename = "inlineData", alias = "inlineAudio")]
        inline_data: InlineData,
    },
}

impl Part {
    /// Builds a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Builds an inline media part.
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// One entry in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ConversationTurn {
    /// A user turn carrying a single recorded audio clip.
    pub fn user_audio(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::inline(mime_type, data)],
        }
    }
}

/// Why a `context` value could not be used as history.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context is not a string")]
    NotAString,

    #[error("context is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("context is not a JSON array")]
    NotAnArray,

    #[error("context contains a malformed turn: {0}")]
    InvalidTurn(serde_json::Error),
}

/// Decodes the JSON-encoded conversation history sent by the client.
///
/// `None`, `null` and blank strings mean "no history". Any value other than
/// a string is rejected, including an array that was not JSON-encoded first.
/// Callers are expected to treat an `Err` as an empty history; the error only
/// exists so it can be logged.
pub fn parse_context(context: Option<&Value>) -> Result<Vec<ConversationTurn>, ContextError> {
    let raw = match context {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(raw)) => raw,
        Some(_) => return Err(ContextError::NotAString),
    };

    let value: Value = serde_json::from_str(raw).map_err(ContextError::InvalidJson)?;
    if !value.is_array() {
        return Err(ContextError::NotAnArray);
    }

    serde_json::from_value(value).map_err(ContextError::InvalidTurn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(raw: &str) -> Value {
        Value::String(raw.to_string())
    }

    #[test]
    fn absent_or_blank_context_is_empty_history() {
        assert!(parse_context(None).unwrap().is_empty());
        assert!(parse_context(Some(&Value::Null)).unwrap().is_empty());
        assert!(parse_context(Some(&encoded(""))).unwrap().is_empty());
        assert!(parse_context(Some(&encoded("   "))).unwrap().is_empty());
    }

    #[test]
    fn parses_mixed_history() {
        let raw = encoded(
            r#"[
            {"role": "user", "parts": [
                {"inlineData": {"mimeType": "audio/webm", "data": "AAAA"}}
            ]},
            {"role": "model", "parts": [{"text": "Hello there"}]}
        ]"#,
        );

        let turns = parse_context(Some(&raw)).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ConversationTurn::user_audio("audio/webm", "AAAA"));
        assert_eq!(turns[1].role, Role::Model);
        assert_eq!(turns[1].parts, vec![Part::text("Hello there")]);
    }

    #[test]
    fn accepts_inline_audio_alias() {
        let raw = encoded(
            r#"[{
                "role": "user",
                "parts": [{"inlineAudio": {"mimeType": "audio/ogg", "data": "QUJD"}}]
            }]"#,
        );
        let turns = parse_context(Some(&raw)).unwrap();
        assert_eq!(turns[0].parts, vec![Part::inline("audio/ogg", "QUJD")]);
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            parse_context(Some(&encoded("[{not json"))),
            Err(ContextError::InvalidJson(_))
        ));
    }

    #[test]
    fn non_array_is_rejected() {
        assert!(matches!(
            parse_context(Some(&encoded(r#"{"role": "user", "parts": []}"#))),
            Err(ContextError::NotAnArray)
        ));
        assert!(matches!(
            parse_context(Some(&encoded("42"))),
            Err(ContextError::NotAnArray)
        ));
    }

    #[test]
    fn non_string_values_are_rejected() {
        let values = [
            serde_json::json!(42),
            serde_json::json!(true),
            serde_json::json!({ "role": "user", "parts": [] }),
            serde_json::json!([{ "role": "model", "parts": [{ "text": "hi" }] }]),
        ];
        for value in values {
            assert!(matches!(
                parse_context(Some(&value)),
                Err(ContextError::NotAString)
            ));
        }
    }

    #[test]
    fn malformed_turn_is_rejected() {
        assert!(matches!(
            parse_context(Some(&encoded(r#"[{"role": "narrator", "parts": []}]"#))),
            Err(ContextError::InvalidTurn(_))
        ));
    }

    #[test]
    fn inline_part_serializes_with_gemini_key() {
        let json = serde_json::to_value(Part::inline("audio/webm", "AAAA")).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "audio/webm");
        assert_eq!(json["inlineData"]["data"], "AAAA");
    }
}
