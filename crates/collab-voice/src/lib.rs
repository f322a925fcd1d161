//! Voice round trip for the CollabCopilot assistant.
//!
//! A recorded clip goes to a language-generation provider (Gemini), which
//! listens to it and answers in text; the answer then goes to a
//! speech-synthesis provider (ElevenLabs). Providers sit behind the
//! [`TextGenerator`] and [`SpeechSynthesizer`] traits so the orchestration in
//! [`VoiceExchange`] can be exercised without network access.
//!
//! Synthesis is best effort: any failure there degrades the reply to text.

pub mod config;
pub mod elevenlabs;
pub mod error;
pub mod exchange;
pub mod gemini;
pub mod generation;
pub mod synthesis;

pub use config::{ProviderConfig, DEFAULT_GEMINI_MODEL};
pub use elevenlabs::ElevenLabsClient;
pub use error::VoiceError;
pub use exchange::{build_turns, ExchangeInput, VoiceExchange, NO_TEXT_PLACEHOLDER};
pub use gemini::GeminiClient;
pub use generation::{
    default_safety_settings, drain_reply, GenerationRequest, HarmBlockThreshold, HarmCategory,
    SafetySetting, TextGenerator, TextStream,
};
pub use synthesis::{
    collect_audio, AudioStream, OutputFormat, SpeechRequest, SpeechSynthesizer, MODEL_ID, VOICE_ID,
};
