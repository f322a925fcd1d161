//! The voice round trip: recorded audio in, text and synthesized speech out.

use crate::config::DEFAULT_GEMINI_MODEL;
use crate::error::VoiceError;
use crate::generation::{default_safety_settings, drain_reply, GenerationRequest, TextGenerator};
use crate::synthesis::{collect_audio, SpeechRequest, SpeechSynthesizer};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use collab_types::{parse_context, ConversationTurn, VoiceRequest, VoiceResponse};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Reply text used when the language model produced nothing speakable.
pub const NO_TEXT_PLACEHOLDER: &str = "(No text response from Gemini)";

const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Validated inputs of one exchange.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeInput<'a> {
    pub audio_data: &'a str,
    pub mime_type: &'a str,
    pub context: Option<&'a Value>,
    pub model: Option<&'a str>,
}

impl<'a> ExchangeInput<'a> {
    /// `None` when the request lacks audio data or its MIME type.
    pub fn from_request(request: &'a VoiceRequest) -> Option<Self> {
        let (audio_data, mime_type) = request.audio()?;
        Some(Self {
            audio_data,
            mime_type,
            context: request.context.as_ref(),
            model: request.model(),
        })
    }
}

/// Runs one voice exchange against a language provider and a speech provider.
///
/// Holds no per-request state; cloning shares the provider clients.
#[derive(Clone)]
pub struct VoiceExchange {
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    default_model: String,
    synthesis_timeout: Duration,
}

impl VoiceExchange {
    pub fn new(generator: Arc<dyn TextGenerator>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            generator,
            synthesizer,
            default_model: DEFAULT_GEMINI_MODEL.to_string(),
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    /// Generates the reply text and, best effort, its speech.
    ///
    /// Only generation failures are returned as errors. Synthesis failures,
    /// including the deadline expiring, produce a text-only response.
    pub async fn respond(&self, input: ExchangeInput<'_>) -> Result<VoiceResponse, VoiceError> {
        let model = input.model.unwrap_or(self.default_model.as_str());
        info!(mime_type = input.mime_type, model, "voice exchange started");

        let request = GenerationRequest {
            model: model.to_string(),
            contents: build_turns(&input),
            safety_settings: default_safety_settings(),
        };

        let text = drain_reply(self.generator.as_ref(), &request).await?;
        if text.trim().is_empty() {
            info!(provider = self.generator.id(), "language model returned empty text");
            return Ok(VoiceResponse::text_only(NO_TEXT_PLACEHOLDER));
        }
        info!(chars = text.chars().count(), "language model reply received");

        let speech = SpeechRequest::new(text.as_str());
        match self.synthesize(&speech).await {
            Ok(audio) => {
                info!(bytes = audio.len(), "speech synthesized");
                Ok(VoiceResponse::with_audio(
                    text,
                    STANDARD.encode(&audio),
                    speech.output_format.mime_type(),
                ))
            }
            Err(e) => {
                error!(
                    provider = self.synthesizer.id(),
                    error = %e,
                    "speech synthesis failed, responding with text only"
                );
                Ok(VoiceResponse::text_only(text))
            }
        }
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        let work = async {
            let chunks = self.synthesizer.synthesize(request).await?;
            collect_audio(chunks).await
        };

        let audio = tokio::time::timeout(self.synthesis_timeout, work)
            .await
            .map_err(|_| {
                VoiceError::Timeout(format!(
                    "speech synthesis exceeded {:?}",
                    self.synthesis_timeout
                ))
            })??;

        if audio.is_empty() {
            return Err(VoiceError::Synthesis(
                "provider returned no audio".to_string(),
            ));
        }
        Ok(audio)
    }
}

/// Prior history followed by one user turn holding the submitted audio.
///
/// An unusable `context` is logged and treated as empty history.
pub fn build_turns(input: &ExchangeInput<'_>) -> Vec<ConversationTurn> {
    let mut turns = match parse_context(input.context) {
        Ok(turns) => turns,
        Err(e) => {
            warn!(error = %e, "invalid context, using empty history");
            Vec::new()
        }
    };
    turns.push(ConversationTurn::user_audio(input.mime_type, input.audio_data));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TextStream;
    use crate::synthesis::AudioStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use collab_types::{Part, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedText {
        text: &'static str,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl FixedText {
        fn new(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                text,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for FixedText {
        fn id(&self) -> &'static str {
            "fixed"
        }

        async fn complete(&self, request: &GenerationRequest) -> Result<String, VoiceError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.text.to_string())
        }
    }

    enum Behavior {
        Chunks(Vec<&'static [u8]>),
        Fail,
        Hang,
    }

    struct FakeSpeech {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeSpeech {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSpeech {
        fn id(&self) -> &'static str {
            "fake"
        }

        async fn synthesize(&self, _request: &SpeechRequest) -> Result<AudioStream, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Chunks(chunks) => {
                    let items: Vec<Result<Bytes, VoiceError>> = chunks
                        .iter()
                        .map(|&c| Ok(Bytes::from_static(c)))
                        .collect();
                    Ok(Box::pin(futures_util::stream::iter(items)))
                }
                Behavior::Fail => Err(VoiceError::Synthesis("quota exceeded".to_string())),
                Behavior::Hang => Ok(Box::pin(futures_util::stream::pending::<
                    Result<Bytes, VoiceError>,
                >())),
            }
        }
    }

    fn input(context: Option<&Value>) -> ExchangeInput<'_> {
        ExchangeInput {
            audio_data: "AAAA",
            mime_type: "audio/webm;codecs=opus",
            context,
            model: None,
        }
    }

    #[test]
    fn turns_append_audio_after_history() {
        let history = serde_json::json!(
            r#"[{"role": "model", "parts": [{"text": "Earlier reply"}]}]"#
        );
        let turns = build_turns(&input(Some(&history)));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::Model);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(
            turns[1].parts,
            vec![Part::inline("audio/webm;codecs=opus", "AAAA")]
        );
    }

    #[test]
    fn bad_context_becomes_empty_history() {
        let contexts = [
            serde_json::json!("{not json"),
            serde_json::json!(r#"{"role": "user"}"#),
            serde_json::json!("\"text\""),
            serde_json::json!(42),
            serde_json::json!([{ "role": "model", "parts": [{ "text": "raw" }] }]),
        ];
        let expected = vec![ConversationTurn::user_audio("audio/webm;codecs=opus", "AAAA")];
        for context in &contexts {
            assert_eq!(build_turns(&input(Some(context))), expected);
        }
    }

    #[tokio::test]
    async fn blank_reply_short_circuits_synthesis() {
        let speech = FakeSpeech::new(Behavior::Chunks(vec![&b"never"[..]]));
        let exchange = VoiceExchange::new(FixedText::new("  \n\t "), speech.clone());

        let response = exchange.respond(input(None)).await.unwrap();
        assert_eq!(response, VoiceResponse::text_only(NO_TEXT_PLACEHOLDER));
        assert_eq!(speech.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn audio_is_concatenated_and_encoded() {
        let chunks = vec![&b"ID3"[..], &b"\x04\x00"[..], &b"\xff\xfb"[..]];
        let speech = FakeSpeech::new(Behavior::Chunks(chunks));
        let exchange = VoiceExchange::new(FixedText::new("Sure thing."), speech.clone());

        let response = exchange.respond(input(None)).await.unwrap();
        assert_eq!(response.response_text(), "Sure thing.");
        assert_eq!(response.audio_mime_type(), Some("audio/mpeg"));
        let audio = STANDARD.decode(response.audio_base64().unwrap()).unwrap();
        assert_eq!(audio, b"ID3\x04\x00\xff\xfb");
        assert_eq!(speech.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn synthesis_failure_degrades_to_text() {
        let exchange = VoiceExchange::new(
            FixedText::new("Still here."),
            FakeSpeech::new(Behavior::Fail),
        );

        let response = exchange.respond(input(None)).await.unwrap();
        assert_eq!(response, VoiceResponse::text_only("Still here."));
    }

    #[tokio::test]
    async fn empty_audio_degrades_to_text() {
        let exchange = VoiceExchange::new(
            FixedText::new("Quiet."),
            FakeSpeech::new(Behavior::Chunks(vec![])),
        );

        let response = exchange.respond(input(None)).await.unwrap();
        assert_eq!(response, VoiceResponse::text_only("Quiet."));
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_deadline_degrades_to_text() {
        let exchange = VoiceExchange::new(FixedText::new("Slow."), FakeSpeech::new(Behavior::Hang))
            .with_synthesis_timeout(Duration::from_secs(5));

        let response = exchange.respond(input(None)).await.unwrap();
        assert_eq!(response, VoiceResponse::text_only("Slow."));
    }

    #[tokio::test]
    async fn model_defaults_and_overrides() {
        let generator = FixedText::new("ok");
        let exchange = VoiceExchange::new(generator.clone(), FakeSpeech::new(Behavior::Fail))
            .with_default_model("gemini-default");

        exchange.respond(input(None)).await.unwrap();
        let mut custom = input(None);
        custom.model = Some("gemini-custom");
        exchange.respond(custom).await.unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].model, "gemini-default");
        assert_eq!(seen[1].model, "gemini-custom");
        assert_eq!(seen[0].safety_settings, default_safety_settings());
    }

    #[tokio::test]
    async fn streamed_reply_feeds_synthesis() {
        struct Streaming;

        #[async_trait]
        impl TextGenerator for Streaming {
            fn id(&self) -> &'static str {
                "streaming"
            }

            async fn complete(&self, _request: &GenerationRequest) -> Result<String, VoiceError> {
                Err(VoiceError::Generation("unused".to_string()))
            }

            async fn stream(&self, _request: &GenerationRequest) -> Result<TextStream, VoiceError> {
                Ok(Box::pin(futures_util::stream::iter(vec![
                    Ok("Good ".to_string()),
                    Ok("morning".to_string()),
                ])))
            }
        }

        let exchange = VoiceExchange::new(
            Arc::new(Streaming),
            FakeSpeech::new(Behavior::Chunks(vec![&b"mp3"[..]])),
        );
        let response = exchange.respond(input(None)).await.unwrap();
        assert_eq!(response.response_text(), "Good morning");
        assert!(response.audio_base64().is_some());
    }
}
