//! OpenAI Realtime API configuration types.
//!
//! Option enums for model, voice, audio format and turn detection, plus the
//! per-service [`RealtimeConfig`] that the session initializer turns into the
//! one-time `session.update` command.

use serde::{Deserialize, Serialize};

use super::messages::{
    ClientEvent, ContentPart, ConversationItem, InputAudioTranscription, SessionConfig,
    TurnDetection,
};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

// =============================================================================
// Models
// =============================================================================

/// Supported OpenAI Realtime models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RealtimeModel {
    /// Current GA realtime model
    #[default]
    #[serde(rename = "gpt-realtime")]
    GptRealtime,
    /// GPT-4o Realtime Preview
    #[serde(rename = "gpt-4o-realtime-preview")]
    Gpt4oRealtimePreview,
    /// GPT-4o Mini Realtime Preview
    #[serde(rename = "gpt-4o-mini-realtime-preview")]
    Gpt4oMiniRealtimePreview,
}

impl RealtimeModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GptRealtime => "gpt-realtime",
            Self::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            Self::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gpt-realtime" => Self::GptRealtime,
            "gpt-4o-realtime-preview" => Self::Gpt4oRealtimePreview,
            "gpt-4o-mini-realtime-preview" => Self::Gpt4oMiniRealtimePreview,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for RealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Available voices for the Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    /// Ash voice
    Ash,
    /// Ballad voice
    Ballad,
    /// Coral voice
    Coral,
    /// Echo voice
    Echo,
    /// Sage voice
    Sage,
    /// Shimmer voice
    Shimmer,
    /// Verse voice
    Verse,
}

impl RealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for RealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio codecs the Realtime API accepts and emits.
///
/// Twilio voice calls use G.711 u-law at 8kHz, so that is the default for
/// this bridge. The model then produces audio Twilio can play without
/// transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// PCM 16-bit signed little-endian
    Pcm16,
    /// G.711 u-law (default for telephony)
    #[default]
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
    /// G.711 a-law
    #[serde(rename = "g711_alaw")]
    G711Alaw,
}

impl AudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }

    /// Get the sample rate for this format.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm16 => 24000,
            Self::G711Ulaw | Self::G711Alaw => 8000,
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pcm16" | "pcm" | "linear16" => Self::Pcm16,
            "g711_ulaw" | "ulaw" | "mulaw" => Self::G711Ulaw,
            "g711_alaw" | "alaw" => Self::G711Alaw,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Turn detection
// =============================================================================

/// Policy governing when the model decides the caller finished speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnDetectionPolicy {
    /// Server-driven voice activity detection (default)
    #[default]
    ServerVad,
    /// Semantic end-of-turn detection
    SemanticVad,
}

impl TurnDetectionPolicy {
    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "server_vad" | "vad" => Self::ServerVad,
            "semantic_vad" | "semantic" => Self::SemanticVad,
            _ => Self::default(),
        }
    }

    fn to_wire(self) -> TurnDetection {
        match self {
            Self::ServerVad => TurnDetection::ServerVad {
                threshold: None,
                prefix_padding_ms: None,
                silence_duration_ms: None,
            },
            Self::SemanticVad => TurnDetection::SemanticVad { eagerness: None },
        }
    }
}

// =============================================================================
// Realtime configuration + session initializer
// =============================================================================

/// Model-side configuration for one bridge process.
///
/// Assembled once at startup from [`crate::config::ServerConfig`] and shared
/// by every call session. Immutable after that point.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// OpenAI API key
    pub api_key: String,
    /// Realtime model to connect to
    pub model: RealtimeModel,
    /// Voice for audio output
    pub voice: RealtimeVoice,
    /// Audio codec used for both input and output
    pub audio_format: AudioFormat,
    /// System instructions for the assistant
    pub instructions: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Transcription model for caller audio, if transcription is wanted
    pub transcription_model: Option<String>,
    /// Turn detection policy
    pub turn_detection: TurnDetectionPolicy,
    /// Whether the assistant should speak first
    pub greet_first: bool,
}

impl RealtimeConfig {
    /// WebSocket URL including the model parameter.
    pub fn ws_url(&self) -> String {
        format!("{}?model={}", OPENAI_REALTIME_URL, self.model.as_str())
    }

    /// The one-time `session.update` command sent before any relay traffic.
    ///
    /// Declares audio formats, voice, transcription and turn detection.
    /// Failure to deliver it is fatal to the session.
    pub fn session_update(&self) -> ClientEvent {
        ClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: Some(vec!["audio".to_string(), "text".to_string()]),
                instructions: Some(self.instructions.clone()),
                voice: Some(self.voice.as_str().to_string()),
                input_audio_format: Some(self.audio_format.as_str().to_string()),
                output_audio_format: Some(self.audio_format.as_str().to_string()),
                input_audio_transcription: self.transcription_model.as_ref().map(|model| {
                    InputAudioTranscription {
                        model: model.clone(),
                        language: None,
                    }
                }),
                turn_detection: Some(self.turn_detection.to_wire()),
                temperature: Some(self.temperature),
            },
        }
    }

    /// Commands that make the assistant speak first, when configured.
    pub fn greeting(&self) -> [ClientEvent; 2] {
        [
            ClientEvent::ConversationItemCreate {
                item: ConversationItem {
                    item_type: "message".to_string(),
                    role: Some("user".to_string()),
                    content: Some(vec![ContentPart {
                        content_type: "input_text".to_string(),
                        text: Some(
                            "Greet the caller warmly, introduce yourself as a voice assistant, \
                             and ask how you can help."
                                .to_string(),
                        ),
                    }]),
                },
            },
            ClientEvent::ResponseCreate,
        ]
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: RealtimeModel::default(),
            voice: RealtimeVoice::default(),
            audio_format: AudioFormat::default(),
            instructions: String::new(),
            temperature: 0.8,
            transcription_model: Some("whisper-1".to_string()),
            turn_detection: TurnDetectionPolicy::default(),
            greet_first: false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_round_trip() {
        assert_eq!(RealtimeModel::GptRealtime.as_str(), "gpt-realtime");
        assert_eq!(
            RealtimeModel::from_str_or_default("gpt-4o-mini-realtime-preview"),
            RealtimeModel::Gpt4oMiniRealtimePreview
        );
        assert_eq!(
            RealtimeModel::from_str_or_default("unknown"),
            RealtimeModel::GptRealtime
        );
    }

    #[test]
    fn test_voice_from_str() {
        assert_eq!(
            RealtimeVoice::from_str_or_default("SHIMMER"),
            RealtimeVoice::Shimmer
        );
        assert_eq!(
            RealtimeVoice::from_str_or_default("unknown"),
            RealtimeVoice::Alloy
        );
    }

    #[test]
    fn test_audio_format_defaults_to_ulaw() {
        assert_eq!(AudioFormat::default(), AudioFormat::G711Ulaw);
        assert_eq!(AudioFormat::G711Ulaw.sample_rate(), 8000);
        assert_eq!(AudioFormat::from_str_or_default("mulaw"), AudioFormat::G711Ulaw);
        assert_eq!(AudioFormat::from_str_or_default("linear16"), AudioFormat::Pcm16);
    }

    #[test]
    fn test_turn_detection_parse() {
        assert_eq!(
            TurnDetectionPolicy::from_str_or_default("semantic_vad"),
            TurnDetectionPolicy::SemanticVad
        );
        assert_eq!(
            TurnDetectionPolicy::from_str_or_default("whatever"),
            TurnDetectionPolicy::ServerVad
        );
    }

    #[test]
    fn test_ws_url() {
        let config = RealtimeConfig::default();
        assert_eq!(
            config.ws_url(),
            "wss://api.openai.com/v1/realtime?model=gpt-realtime"
        );
    }

    #[test]
    fn test_session_update_wire_format() {
        let config = RealtimeConfig {
            instructions: "Be helpful".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config.session_update()).unwrap();
        assert!(json.contains(r#""type":"session.update""#));
        assert!(json.contains(r#""voice":"alloy""#));
        assert!(json.contains(r#""input_audio_format":"g711_ulaw""#));
        assert!(json.contains(r#""output_audio_format":"g711_ulaw""#));
        assert!(json.contains(r#""turn_detection":{"type":"server_vad"}"#));
        assert!(json.contains("Be helpful"));
    }

    #[test]
    fn test_session_update_semantic_vad() {
        let config = RealtimeConfig {
            turn_detection: TurnDetectionPolicy::SemanticVad,
            ..Default::default()
        };
        let json = serde_json::to_string(&config.session_update()).unwrap();
        assert!(json.contains(r#""turn_detection":{"type":"semantic_vad"}"#));
    }

    #[test]
    fn test_greeting_commands() {
        let config = RealtimeConfig::default();
        let [item, response] = config.greeting();
        let item_json = serde_json::to_string(&item).unwrap();
        assert!(item_json.contains(r#""type":"conversation.item.create""#));
        assert!(item_json.contains("Greet the caller"));
        let response_json = serde_json::to_string(&response).unwrap();
        assert!(response_json.contains(r#""type":"response.create""#));
    }
}
