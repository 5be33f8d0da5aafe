//! Application-level errors surfaced through HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors a request handler can return.
#[derive(Debug, Error)]
pub enum AppError {
    /// The server is missing configuration it needs to answer this request.
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),
}

/// Result alias for request handlers.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("request failed: {self}");
        (status, self.to_string()).into_response()
    }
}
