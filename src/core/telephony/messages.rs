//! Twilio Media Streams WebSocket message types.
//!
//! Media Streams is a JSON-over-WebSocket protocol. Every frame carries an
//! `event` discriminator. Inbound events describe the call leg (`connected`,
//! `start`, `media`, `mark`, `stop`); outbound events drive playback on the
//! caller's phone (`media`, `mark`, `clear`).
//!
//! Audio payloads are base64-encoded in the platform codec (G.711 u-law at
//! 8kHz for voice calls) and are relayed opaquely; the bridge never decodes
//! them.

use serde::{Deserialize, Deserializer, Serialize};

/// Name attached to playback progress markers emitted by the bridge.
pub const MARK_NAME: &str = "responsePart";

// =============================================================================
// Inbound events (Twilio -> bridge)
// =============================================================================

/// Events received from Twilio over the media stream socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioEvent {
    /// First frame after the WebSocket handshake.
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    /// Stream metadata; carries the stream identifier used on every
    /// outbound frame for the rest of the call.
    Start { start: StreamStart },

    /// One inbound audio frame from the caller.
    Media { media: MediaFrame },

    /// Playback acknowledgment for a previously emitted mark.
    Mark {
        #[serde(default)]
        mark: Option<MarkInfo>,
    },

    /// Stream ended (hangup or platform teardown).
    Stop,

    /// Any event kind this bridge does not recognize. Kept as an explicit
    /// variant so new platform events surface in logs instead of crashing
    /// the relay loop.
    #[serde(other)]
    Unrecognized,
}

/// Metadata delivered with the `start` event.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStart {
    /// Opaque stream handle assigned by Twilio.
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// Call this stream belongs to.
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
    /// Account that owns the call.
    #[serde(rename = "accountSid", default)]
    pub account_sid: Option<String>,
}

/// One frame of caller audio.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFrame {
    /// Base64-encoded audio in the stream's native codec.
    pub payload: String,
    /// Milliseconds since stream start. Twilio encodes this as a JSON
    /// string; tolerate a plain number as well.
    #[serde(deserialize_with = "timestamp_ms")]
    pub timestamp: u64,
}

/// Mark acknowledgment body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkInfo {
    pub name: String,
}

fn timestamp_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Number(u64),
        String(String),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => Ok(n),
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Outbound events (bridge -> Twilio)
// =============================================================================

/// Events the bridge emits back to Twilio.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioCommand {
    /// Play an audio chunk to the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },

    /// Ask Twilio to echo a marker back once playback reaches this point.
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkInfo,
    },

    /// Flush any audio Twilio has buffered but not yet played.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Outbound audio body.
#[derive(Debug, Clone, Serialize)]
pub struct MediaPayload {
    /// Base64-encoded audio, passed through from the model unchanged.
    pub payload: String,
}

impl TwilioCommand {
    /// Audio chunk addressed to the given stream.
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TwilioCommand::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }

    /// Playback progress marker addressed to the given stream.
    pub fn mark(stream_sid: impl Into<String>) -> Self {
        TwilioCommand::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkInfo {
                name: MARK_NAME.to_string(),
            },
        }
    }

    /// Buffer flush addressed to the given stream.
    pub fn clear(stream_sid: impl Into<String>) -> Self {
        TwilioCommand::Clear {
            stream_sid: stream_sid.into(),
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
    fn test_parse_start_event() {
        let json = r#"{
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "accountSid": "AC0000",
                "callSid": "CA0001",
                "streamSid": "MZ0001",
                "tracks": ["inbound"]
            },
            "streamSid": "MZ0001"
        }"#;
        let event: TwilioEvent = serde_json::from_str(json).unwrap();
        match event {
            TwilioEvent::Start { start } => {
                assert_eq!(start.stream_sid, "MZ0001");
                assert_eq!(start.call_sid.as_deref(), Some("CA0001"));
            }
            other => panic!("expected start, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_media_with_string_timestamp() {
        let json = r#"{
            "event": "media",
            "media": {"track": "inbound", "chunk": "2", "timestamp": "160", "payload": "AA=="}
        }"#;
        let event: TwilioEvent = serde_json::from_str(json).unwrap();
        match event {
            TwilioEvent::Media { media } => {
                assert_eq!(media.timestamp, 160);
                assert_eq!(media.payload, "AA==");
            }
            other => panic!("expected media, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_media_with_numeric_timestamp() {
        let json = r#"{"event": "media", "media": {"timestamp": 100, "payload": "AA"}}"#;
        let event: TwilioEvent = serde_json::from_str(json).unwrap();
        match event {
            TwilioEvent::Media { media } => assert_eq!(media.timestamp, 100),
            other => panic!("expected media, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_mark_ack() {
        let json = r#"{"event": "mark", "streamSid": "MZ0001", "mark": {"name": "responsePart"}}"#;
        let event: TwilioEvent = serde_json::from_str(json).unwrap();
        match event {
            TwilioEvent::Mark { mark } => {
                assert_eq!(mark.unwrap().name, MARK_NAME);
            }
            other => panic!("expected mark, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_kind_is_unrecognized() {
        let json = r#"{"event": "dtmf", "dtmf": {"digit": "5"}}"#;
        let event: TwilioEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, TwilioEvent::Unrecognized));
    }

    #[test]
    fn test_media_command_serialization() {
        let cmd = TwilioCommand::media("MZ0001", "Zm9v");
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""event":"media""#));
        assert!(json.contains(r#""streamSid":"MZ0001""#));
        assert!(json.contains(r#""payload":"Zm9v""#));
    }

    #[test]
    fn test_mark_command_serialization() {
        let json = serde_json::to_string(&TwilioCommand::mark("MZ0001")).unwrap();
        assert!(json.contains(r#""event":"mark""#));
        assert!(json.contains(r#""name":"responsePart""#));
    }

    #[test]
    fn test_clear_command_serialization() {
        let json = serde_json::to_string(&TwilioCommand::clear("MZ0001")).unwrap();
        assert!(json.contains(r#""event":"clear""#));
        assert!(json.contains(r#""streamSid":"MZ0001""#));
    }
}
