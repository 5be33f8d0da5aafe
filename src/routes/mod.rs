//! Route configuration.

pub mod api;
pub mod media;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Assemble the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(media::create_media_router())
        .with_state(state)
}
