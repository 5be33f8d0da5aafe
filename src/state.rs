//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;

/// State shared across all request handlers via axum's `State` extractor.
pub struct AppState {
    /// Immutable server configuration
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}
