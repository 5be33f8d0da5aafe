//! Model-side transport: OpenAI Realtime API client, protocol types and
//! session configuration.

mod client;
mod config;
mod messages;

pub use client::{ModelConnection, ModelEventStream};
pub use config::{
    AudioFormat, OPENAI_REALTIME_URL, RealtimeConfig, RealtimeModel, RealtimeVoice,
    TurnDetectionPolicy,
};
pub use messages::{
    ApiError, ClientEvent, ContentPart, ConversationItem, InputAudioTranscription, ResponseInfo,
    ServerEvent, SessionConfig, SessionInfo, TurnDetection,
};

use thiserror::Error;

/// Errors that can occur on the model transport.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the API failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}
