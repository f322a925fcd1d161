use crate::elevenlabs::ElevenLabsClient;
use crate::error::VoiceError;
use crate::gemini::GeminiClient;
use crate::generation::TextGenerator;
use crate::synthesis::SpeechSynthesizer;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Language model used when a request does not name one.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_elevenlabs_base_url() -> String {
    DEFAULT_ELEVENLABS_BASE_URL.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Credentials and endpoints for the two upstream providers.
///
/// Both keys are optional here: a missing key is reported per request, not at
/// startup, so the service can still answer health checks while misconfigured.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, deserialize_with = "deserialize_option_secret")]
    pub gemini_api_key: Option<Secret<String>>,
    #[serde(default, deserialize_with = "deserialize_option_secret")]
    pub elevenlabs_api_key: Option<Secret<String>>,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub default_model: String,
    /// Deadline for one Gemini request, body included. Default: 60.
    #[serde(default = "default_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Deadline for the whole synthesis phase. Default: 60.
    #[serde(default = "default_timeout_secs")]
    pub synthesis_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            elevenlabs_api_key: None,
            gemini_base_url: default_gemini_base_url(),
            elevenlabs_base_url: default_elevenlabs_base_url(),
            default_model: default_gemini_model(),
            generation_timeout_secs: default_timeout_secs(),
            synthesis_timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<Secret<String>>) -> &'static str {
            if key.is_some() {
                "[REDACTED]"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("ProviderConfig")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("default_model", &self.default_model)
            .field("generation_timeout_secs", &self.generation_timeout_secs)
            .field("synthesis_timeout_secs", &self.synthesis_timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    /// Builds the Gemini client, or `None` when no key is configured.
    pub fn text_generator(&self) -> Result<Option<Arc<dyn TextGenerator>>, VoiceError> {
        let Some(key) = usable_key(&self.gemini_api_key) else {
            return Ok(None);
        };
        let client = GeminiClient::new(key, &self.gemini_base_url, self.generation_timeout())?;
        Ok(Some(Arc::new(client)))
    }

    /// Builds the ElevenLabs client, or `None` when no key is configured.
    pub fn speech_synthesizer(&self) -> Result<Option<Arc<dyn SpeechSynthesizer>>, VoiceError> {
        let Some(key) = usable_key(&self.elevenlabs_api_key) else {
            return Ok(None);
        };
        let client = ElevenLabsClient::new(key, &self.elevenlabs_base_url)?;
        Ok(Some(Arc::new(client)))
    }
}

fn usable_key(key: &Option<Secret<String>>) -> Option<Secret<String>> {
    key.as_ref()
        .filter(|k| !k.expose_secret().trim().is_empty())
        .cloned()
}

fn deserialize_option_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()).map(Secret::new))
}
