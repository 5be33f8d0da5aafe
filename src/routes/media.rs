//! Media stream WebSocket route configuration
//!
//! This module configures the WebSocket endpoint Twilio Media Streams
//! connects to after the voice webhook returns its TwiML.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media::{MEDIA_STREAM_PATH, media_stream_handler};
use crate::state::AppState;

/// Create the media stream router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for a bidirectional call stream
///
/// # Protocol
///
/// After the upgrade, Twilio sends JSON frames tagged by `event`
/// (`connected`, `start`, `media`, `mark`, `stop`); the server sends back
/// `media`, `mark`, and `clear` frames. Audio payloads are base64 G.711
/// u-law both ways.
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
