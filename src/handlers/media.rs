//! Media stream session handler.
//!
//! One call equals one WebSocket from Twilio plus one WebSocket to the
//! realtime model. This module owns the session lifecycle: accept the
//! upgrade, dial the model, run a single `select!` loop that feeds both
//! directions through the [`Relay`], and tear both transports down when
//! either side ends.
//!
//! Writes never happen from the select loop directly. Each transport has a
//! writer task fed by an `mpsc` channel, so a slow peer stalls its own
//! channel instead of the event loop.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::realtime::ModelConnection;
use crate::core::realtime::ServerEvent;
use crate::core::relay::{Relay, TwilioRoute};
use crate::core::telephony::TwilioEvent;
use crate::state::AppState;

/// Path Twilio connects to; also embedded in the TwiML stream URL.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Capacity of the outbound telephony channel. Assistant audio arrives in
/// bursts much faster than the phone drains it.
const TELEPHONY_CHANNEL_CAPACITY: usize = 1024;

/// WebSocket upgrade for an inbound Twilio media stream.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>) {
    let call_id = Uuid::new_v4();
    info!(%call_id, "telephony client connected");

    let (ws_sink, mut telephony_events) = socket.split();
    let (twilio_tx, twilio_rx) = mpsc::channel::<TwilioRoute>(TELEPHONY_CHANNEL_CAPACITY);
    let writer = tokio::spawn(telephony_writer(ws_sink, twilio_rx));

    let mut model = match ModelConnection::connect(&state.config.realtime).await {
        Ok(model) => model,
        Err(e) => {
            error!(%call_id, "model connection failed: {e}");
            close_telephony(twilio_tx, writer).await;
            return;
        }
    };

    // The session is useless without its configuration, so a failure here
    // is fatal for the call.
    if let Err(e) = model.send(state.config.realtime.session_update()).await {
        error!(%call_id, "failed to configure model session: {e}");
        model.shutdown();
        close_telephony(twilio_tx, writer).await;
        return;
    }

    if state.config.realtime.greet_first {
        for event in state.config.realtime.greeting() {
            if let Err(e) = model.send(event).await {
                warn!(%call_id, "failed to request greeting: {e}");
                break;
            }
        }
    }

    let mut model_events = model.take_events();
    let mut relay = Relay::new(model.sender(), model.open_flag(), twilio_tx.clone());

    loop {
        tokio::select! {
            telephony_msg = telephony_events.next() => {
                match telephony_msg {
                    Some(Ok(Message::Text(text))) => {
                        if !on_telephony_text(&mut relay, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(%call_id, "telephony socket closed");
                        break;
                    }
                    // Pings are answered by axum; binary frames do not occur
                    // on media streams.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%call_id, "telephony socket error: {e}");
                        break;
                    }
                }
            }

            model_msg = model_events.next() => {
                match model_msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if !on_model_text(&mut relay, &text).await {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!(%call_id, "model transport closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%call_id, "model transport error: {e}");
                        break;
                    }
                }
            }
        }
    }

    model.shutdown();
    info!(
        %call_id,
        marks_outstanding = relay.session().marks_outstanding(),
        "call session ended"
    );
    close_telephony(twilio_tx, writer).await;
}

/// Dispatch one telephony text frame. Frames that fail to parse are logged
/// and skipped; only the relay can end the session.
async fn on_telephony_text(relay: &mut Relay, text: &str) -> bool {
    match serde_json::from_str::<TwilioEvent>(text) {
        Ok(event) => relay.on_telephony(event).await,
        Err(e) => {
            warn!("malformed telephony frame: {e}");
            true
        }
    }
}

/// Dispatch one model text frame, same contract as [`on_telephony_text`].
async fn on_model_text(relay: &mut Relay, text: &str) -> bool {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => relay.on_model(event).await,
        Err(e) => {
            warn!("malformed model frame: {e}");
            true
        }
    }
}

/// Drain routed frames onto the Twilio socket until a `Close` arrives or the
/// channel is dropped.
async fn telephony_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<TwilioRoute>,
) {
    while let Some(route) = rx.recv().await {
        match route {
            TwilioRoute::Outgoing(command) => {
                let json = match serde_json::to_string(&command) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("failed to serialize telephony frame: {e}");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    debug!("telephony send failed: {e}");
                    break;
                }
            }
            TwilioRoute::Close => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    debug!("telephony writer task ended");
}

/// Ask the writer to close the socket and wait for it to finish.
async fn close_telephony(
    twilio_tx: mpsc::Sender<TwilioRoute>,
    writer: tokio::task::JoinHandle<()>,
) {
    let _ = twilio_tx.send(TwilioRoute::Close).await;
    drop(twilio_tx);
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::core::realtime::ClientEvent;
    use crate::core::telephony::TwilioCommand;

    fn test_relay() -> (Relay, mpsc::Receiver<ClientEvent>, mpsc::Receiver<TwilioRoute>) {
        let (model_tx, model_rx) = mpsc::channel(64);
        let (twilio_tx, twilio_rx) = mpsc::channel(64);
        let open = Arc::new(AtomicBool::new(true));
        (Relay::new(model_tx, open, twilio_tx), model_rx, twilio_rx)
    }

    #[tokio::test]
    async fn test_malformed_telephony_frame_keeps_session_alive() {
        let (mut relay, mut model_rx, _twilio_rx) = test_relay();

        assert!(on_telephony_text(&mut relay, "{not json").await);
        assert!(on_telephony_text(&mut relay, r#"{"media": {}}"#).await);

        // The relay still works after the bad frames.
        let start = r#"{"event": "start", "start": {"streamSid": "MZ0001"}}"#;
        assert!(on_telephony_text(&mut relay, start).await);
        let media = r#"{"event": "media", "media": {"timestamp": "40", "payload": "AA"}}"#;
        assert!(on_telephony_text(&mut relay, media).await);

        assert!(matches!(
            model_rx.try_recv().unwrap(),
            ClientEvent::InputAudioBufferAppend { .. }
        ));
        assert_eq!(relay.session().latest_media_timestamp(), 40);
    }

    #[tokio::test]
    async fn test_malformed_model_frame_keeps_session_alive() {
        let (mut relay, _model_rx, mut twilio_rx) = test_relay();
        let start = r#"{"event": "start", "start": {"streamSid": "MZ0001"}}"#;
        assert!(on_telephony_text(&mut relay, start).await);

        assert!(on_model_text(&mut relay, "garbage").await);
        assert!(on_model_text(&mut relay, r#"{"delta": "Zm9v"}"#).await);

        let delta = r#"{"type": "response.audio.delta", "delta": "Zm9v", "item_id": "it1"}"#;
        assert!(on_model_text(&mut relay, delta).await);

        assert!(matches!(
            twilio_rx.try_recv().unwrap(),
            TwilioRoute::Outgoing(TwilioCommand::Media { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_frame_still_ends_session() {
        let (mut relay, _model_rx, _twilio_rx) = test_relay();
        assert!(!on_telephony_text(&mut relay, r#"{"event": "stop"}"#).await);
    }
}
