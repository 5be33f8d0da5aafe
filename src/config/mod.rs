//! Server configuration.
//!
//! Configuration comes from environment variables (with `.env` support via
//! `dotenvy` in `main`), is validated once at startup, and is immutable for
//! the life of the process.
//!
//! # Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `HOST` | `0.0.0.0` | Bind address |
//! | `PORT` | `5050` | Bind port |
//! | `PUBLIC_HOST` | unset | Public base URL used in TwiML stream URLs |
//! | `OPENAI_API_KEY` | required | Model credential |
//! | `OPENAI_REALTIME_MODEL` | `gpt-realtime` | Realtime model |
//! | `VOICE` | `alloy` | Assistant voice |
//! | `AUDIO_FORMAT` | `g711_ulaw` | Audio codec both directions |
//! | `TURN_DETECTION` | `server_vad` | `server_vad` or `semantic_vad` |
//! | `TRANSCRIPTION_MODEL` | `whisper-1` | Caller transcription, `none` to disable |
//! | `TEMPERATURE` | `0.8` | Sampling temperature |
//! | `SYSTEM_MESSAGE` | built-in | Assistant instructions |
//! | `ANNOUNCEMENT` | built-in | Pre-connect spoken announcement |
//! | `GREET_FIRST` | `false` | Assistant speaks first |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | unset | Serve HTTPS/WSS directly |

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::core::realtime::{
    AudioFormat, RealtimeConfig, RealtimeModel, RealtimeVoice, TurnDetectionPolicy,
};

/// Default system instructions for the assistant.
const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful and bubbly AI assistant who loves to chat about anything \
     the user is interested in and is prepared to offer them facts. You have a \
     penchant for dad jokes, owl jokes, and rickrolling - subtly. Always stay \
     positive, but work in a joke when appropriate.";

/// Default pre-connect announcement spoken before the stream opens.
const DEFAULT_ANNOUNCEMENT: &str =
    "Please wait while we connect your call to the A I voice assistant.";

/// Configuration errors, all fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing OPENAI_API_KEY. Set it in the environment or a .env file.")]
    MissingApiKey,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid PUBLIC_HOST '{0}': must be an absolute http(s) or ws(s) URL")]
    InvalidPublicHost(String),

    #[error("TLS requires both TLS_CERT_PATH and TLS_KEY_PATH")]
    PartialTls,
}

/// TLS configuration for serving HTTPS/WSS directly.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Public base URL, preferred over the request Host header when
    /// building TwiML stream URLs (useful behind tunnels and proxies).
    pub public_host: Option<Url>,
    /// Optional TLS material for direct WSS serving
    pub tls: Option<TlsConfig>,
    /// Announcement spoken before the media stream connects
    pub announcement: String,
    /// Model-side configuration shared by all call sessions
    pub realtime: RealtimeConfig,
}

impl ServerConfig {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port = parse_port(&env_or("PORT", "5050"))?;

        let public_host = match std::env::var("PUBLIC_HOST") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_public_host(raw.trim())?),
            _ => None,
        };

        let tls = match (std::env::var("TLS_CERT_PATH"), std::env::var("TLS_KEY_PATH")) {
            (Ok(cert), Ok(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (Err(_), Err(_)) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let transcription_model = match env_or("TRANSCRIPTION_MODEL", "whisper-1").as_str() {
            "none" | "off" => None,
            model => Some(model.to_string()),
        };

        let realtime = RealtimeConfig {
            api_key,
            model: RealtimeModel::from_str_or_default(&env_or(
                "OPENAI_REALTIME_MODEL",
                "gpt-realtime",
            )),
            voice: RealtimeVoice::from_str_or_default(&env_or("VOICE", "alloy")),
            audio_format: AudioFormat::from_str_or_default(&env_or("AUDIO_FORMAT", "g711_ulaw")),
            instructions: env_or("SYSTEM_MESSAGE", DEFAULT_SYSTEM_MESSAGE),
            temperature: parse_temperature(&env_or("TEMPERATURE", "0.8"))?,
            transcription_model,
            turn_detection: TurnDetectionPolicy::from_str_or_default(&env_or(
                "TURN_DETECTION",
                "server_vad",
            )),
            greet_first: parse_bool(&env_or("GREET_FIRST", "false")),
        };

        Ok(Self {
            host,
            port,
            public_host,
            tls,
            announcement: env_or("ANNOUNCEMENT", DEFAULT_ANNOUNCEMENT),
            realtime,
        })
    }

    /// Bind address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether TLS serving is configured.
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: "PORT".to_string(),
        value: raw.to_string(),
    })
}

fn parse_temperature(raw: &str) -> Result<f32, ConfigError> {
    let value: f32 = raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: "TEMPERATURE".to_string(),
        value: raw.to_string(),
    })?;
    if !(0.0..=2.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: "TEMPERATURE".to_string(),
            value: raw.to_string(),
        });
    }
    Ok(value)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_public_host(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidPublicHost(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(url),
        _ => Err(ConfigError::InvalidPublicHost(raw.to_string())),
    }
}
