//! Server configuration loading from file and environment variables.

use collab_voice::ProviderConfig;
use secrecy::Secret;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream provider credentials, endpoints and deadlines.
    #[serde(default)]
    pub providers: ProviderConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body. Audio arrives base64-encoded inside
    /// JSON, so this is well above the clip size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "collab_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `COLLAB_HOST` overrides `server.host`
/// - `COLLAB_PORT` overrides `server.port`
/// - `COLLAB_MAX_BODY_BYTES` overrides `server.max_body_bytes`
/// - `COLLAB_LOG_LEVEL` overrides `logging.level`
/// - `COLLAB_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `GEMINI_API_KEY` overrides `providers.gemini_api_key`
/// - `ELEVENLABS_API_KEY` overrides `providers.elevenlabs_api_key`
/// - `COLLAB_GEMINI_BASE_URL` overrides `providers.gemini_base_url`
/// - `COLLAB_ELEVENLABS_BASE_URL` overrides `providers.elevenlabs_base_url`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("COLLAB_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("COLLAB_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(limit) = lookup("COLLAB_MAX_BODY_BYTES") {
        if let Ok(parsed) = limit.parse() {
            config.server.max_body_bytes = parsed;
        }
    }
    if let Some(level) = lookup("COLLAB_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("COLLAB_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
        config.providers.gemini_api_key = Some(Secret::new(key));
    }
    if let Some(key) = lookup("ELEVENLABS_API_KEY").filter(|k| !k.trim().is_empty()) {
        config.providers.elevenlabs_api_key = Some(Secret::new(key));
    }
    if let Some(url) = lookup("COLLAB_GEMINI_BASE_URL") {
        config.providers.gemini_base_url = url;
    }
    if let Some(url) = lookup("COLLAB_ELEVENLABS_BASE_URL") {
        config.providers.elevenlabs_base_url = url;
    }
}
