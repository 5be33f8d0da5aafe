//! OpenAI Realtime API WebSocket message types.
//!
//! Only the slice of the protocol the bridge actually exchanges is modeled.
//! Commands sent: `session.update`, `input_audio_buffer.append`,
//! `conversation.item.create`, `conversation.item.truncate`,
//! `response.create`. Events received: audio deltas/done, speech detection,
//! session lifecycle, errors; everything else lands in an explicit
//! `Unrecognized` variant so new server event kinds never break the relay.
//!
//! Audio event names changed between API snapshots
//! (`response.audio.delta` vs `response.output_audio.delta`); both spellings
//! are accepted via serde aliases.

use serde::{Deserialize, Serialize};

// =============================================================================
// Session configuration
// =============================================================================

/// Session configuration carried by `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
    /// Expected language, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// Semantic VAD
    #[serde(rename = "semantic_vad")]
    SemanticVad {
        #[serde(skip_serializing_if = "Option::is_none")]
        eagerness: Option<String>,
    },
}

/// Conversation item for `conversation.item.create`.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationItem {
    /// Item type (always "message" here)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
}

/// Content part within a conversation item.
#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// =============================================================================
// Client events (sent to the model)
// =============================================================================

/// Commands sent to the Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Append base64 audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    /// Rewind the model's record of an item past what the caller heard
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        item_id: String,
        content_index: u32,
        audio_end_ms: u64,
    },

    /// Ask the model to generate a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Audio append from a payload that is already base64 encoded
    /// (Twilio delivers media frames that way; no re-encoding needed).
    pub fn audio_append(payload_b64: impl Into<String>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload_b64.into(),
        }
    }
}

// =============================================================================
// Server events (received from the model)
// =============================================================================

/// Events received from the Realtime API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error { error: ApiError },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: SessionInfo,
    },

    /// Session configuration acknowledged
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: SessionInfo,
    },

    /// VAD detected caller speech
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: u64,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// VAD detected silence
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: u64,
    },

    /// Input audio buffer committed as a conversation item
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Streaming audio chunk
    #[serde(rename = "response.audio.delta", alias = "response.output_audio.delta")]
    AudioDelta {
        /// Base64 audio in the session's output format
        delta: String,
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Audio generation finished; some snapshots attach the whole clip
    #[serde(rename = "response.audio.done", alias = "response.output_audio.done")]
    AudioDone {
        /// Base64 full clip, present only on non-streaming snapshots
        #[serde(default)]
        audio: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Response generation complete
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: ResponseInfo,
    },

    /// Any event kind the bridge does not act on.
    #[serde(other)]
    Unrecognized,
}

// =============================================================================
// Supporting types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Session lifecycle payload; only the id is interesting for logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub id: Option<String>,
}

/// Response lifecycle payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_append_passes_base64_through() {
        let event = ClientEvent::audio_append("AA");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"input_audio_buffer.append","audio":"AA"}"#);
    }

    #[test]
    fn test_truncate_serialization() {
        let event = ClientEvent::ConversationItemTruncate {
            item_id: "it1".to_string(),
            content_index: 0,
            audio_end_ms: 3000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"conversation.item.truncate""#));
        assert!(json.contains(r#""item_id":"it1""#));
        assert!(json.contains(r#""content_index":0"#));
        assert!(json.contains(r#""audio_end_ms":3000"#));
    }

    #[test]
    fn test_audio_delta_old_and_new_names() {
        for kind in ["response.audio.delta", "response.output_audio.delta"] {
            let json = format!(r#"{{"type":"{kind}","delta":"Zm9v","item_id":"it1"}}"#);
            let event: ServerEvent = serde_json::from_str(&json).unwrap();
            match event {
                ServerEvent::AudioDelta { delta, item_id, .. } => {
                    assert_eq!(delta, "Zm9v");
                    assert_eq!(item_id.as_deref(), Some("it1"));
                }
                other => panic!("expected audio delta, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_audio_done_with_full_clip() {
        let json = r#"{"type":"response.output_audio.done","audio":"Zm9v","item_id":"it2"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::AudioDone { audio, item_id } => {
                assert_eq!(audio.as_deref(), Some("Zm9v"));
                assert_eq!(item_id.as_deref(), Some("it2"));
            }
            other => panic!("expected audio done, got {other:?}"),
        }
    }

    #[test]
    fn test_speech_started_parse() {
        let json = r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":1200,"item_id":"it3"}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            ServerEvent::SpeechStarted { audio_start_ms: 1200, .. }
        ));
    }

    #[test]
    fn test_error_event_parse() {
        let json = r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::Error { error } => {
                assert_eq!(error.error_type, "invalid_request_error");
                assert_eq!(error.message, "bad");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_kind_is_unrecognized() {
        let json = r#"{"type":"rate_limits.updated","rate_limits":[]}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ServerEvent::Unrecognized));
    }
}
