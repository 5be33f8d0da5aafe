//! HTTP route configuration
//!
//! Plain HTTP endpoints: the health check and the Twilio voice webhook.

use std::sync::Arc;

use axum::{
    Router,
    routing::{any, get},
};

use crate::handlers::{api::health_check, twiml::incoming_call};
use crate::state::AppState;

/// Create the HTTP router
///
/// # Endpoints
///
/// - `GET /` - Health check
/// - `ANY /incoming-call` - Twilio voice webhook, answers with TwiML.
///   Method-agnostic because Twilio numbers can be configured for either
///   GET or POST.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/incoming-call", any(incoming_call))
}
