//! Call setup responder.
//!
//! Twilio hits this webhook when a call comes in; the answer is a TwiML
//! document telling the platform to speak a short announcement and then open
//! a bidirectional media stream back to this server's relay endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

use super::media::MEDIA_STREAM_PATH;

/// Inbound call webhook. Method-agnostic: Twilio can be configured for
/// either GET or POST.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let ws_url = stream_url(&state.config, &headers)?;
    let twiml = build_twiml(&state.config.announcement, &ws_url);
    Ok(([(header::CONTENT_TYPE, "application/xml")], twiml))
}

/// Resolve the `wss://` URL Twilio should stream to.
///
/// A configured `PUBLIC_HOST` wins (the bind address is rarely the public
/// one behind tunnels or load balancers); otherwise fall back to the
/// request's Host header. With neither, the server cannot announce a
/// reachable endpoint and the call setup fails as a misconfiguration.
fn stream_url(config: &ServerConfig, headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(url) = &config.public_host {
        let host = url.host_str().ok_or_else(|| {
            AppError::Misconfigured("PUBLIC_HOST has no host component".to_string())
        })?;
        return Ok(match url.port() {
            Some(port) => format!("wss://{host}:{port}{MEDIA_STREAM_PATH}"),
            None => format!("wss://{host}{MEDIA_STREAM_PATH}"),
        });
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Misconfigured(
                "public host unknown; set PUBLIC_HOST or send a Host header".to_string(),
            )
        })?;
    Ok(format!("wss://{host}{MEDIA_STREAM_PATH}"))
}

/// Render the TwiML call-control document.
fn build_twiml(announcement: &str, ws_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Say>{}</Say>
    <Pause length="1"/>
    <Say>O K, you can start talking!</Say>
    <Connect>
        <Stream url="{}"/>
    </Connect>
</Response>"#,
        xml_escape(announcement),
        xml_escape(ws_url)
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
