//! WebSocket client for the OpenAI Realtime API.
//!
//! [`ModelConnection::connect`] performs the handshake and splits the socket:
//! the read half is handed to the caller as a raw event stream, the write
//! half is owned by a spawned writer task fed through an `mpsc` channel.
//! A shared [`AtomicBool`] publishes transport openness so relay code can
//! drop audio frames instead of queuing them while the transport is down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};

use super::RealtimeError;
use super::config::RealtimeConfig;
use super::messages::ClientEvent;

/// Channel capacity for outbound model commands.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stream of raw WebSocket messages from the model.
pub type ModelEventStream = SplitStream<WsStream>;

/// A live connection to the Realtime API.
pub struct ModelConnection {
    events: Option<ModelEventStream>,
    commands: mpsc::Sender<ClientEvent>,
    open: Arc<AtomicBool>,
    writer: JoinHandle<()>,
}

impl ModelConnection {
    /// Connect and authenticate against the Realtime endpoint.
    pub async fn connect(config: &RealtimeConfig) -> Result<Self, RealtimeError> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let url = config.ws_url();
        let host = endpoint_host(&url)?;
        let request = http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(model = %config.model, "connected to realtime API");

        let (ws_sink, ws_stream) = ws_stream.split();
        let (tx, rx) = mpsc::channel::<ClientEvent>(COMMAND_CHANNEL_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));

        let writer = tokio::spawn(writer_loop(ws_sink, rx, open.clone()));

        Ok(Self {
            events: Some(ws_stream),
            commands: tx,
            open,
            writer,
        })
    }

    /// Take the inbound event stream. Panics if taken twice.
    pub fn take_events(&mut self) -> ModelEventStream {
        self.events.take().expect("event stream already taken")
    }

    /// Clone of the command sender for relay code.
    pub fn sender(&self) -> mpsc::Sender<ClientEvent> {
        self.commands.clone()
    }

    /// Shared openness flag for relay code.
    pub fn open_flag(&self) -> Arc<AtomicBool> {
        self.open.clone()
    }

    /// Whether the transport is currently usable.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a command for delivery.
    pub async fn send(&self, event: ClientEvent) -> Result<(), RealtimeError> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.commands
            .send(event)
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))
    }

    /// Mark the transport closed and tear down the writer task.
    ///
    /// Aborting the writer drops the sink, which closes the underlying
    /// connection. Safe to call after the peer already hung up.
    pub fn shutdown(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.writer.abort();
    }
}

/// Host header value for the handshake, taken from the endpoint URL itself
/// so a model or endpoint change cannot leave a stale host behind.
fn endpoint_host(url: &str) -> Result<String, RealtimeError> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| RealtimeError::ConnectionFailed(format!("endpoint URL has no host: {url}")))
}

async fn writer_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<ClientEvent>,
    open: Arc<AtomicBool>,
) {
    while let Some(event) = rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(j) => j,
            Err(e) => {
                error!("failed to serialize model command: {e}");
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(json.into())).await {
            error!("failed to send model command: {e}");
            open.store(false, Ordering::SeqCst);
            break;
        }
    }

    open.store(false, Ordering::SeqCst);
    let _ = sink.send(Message::Close(None)).await;
    debug!("model writer task ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_host_follows_url() {
        let config = RealtimeConfig::default();
        assert_eq!(endpoint_host(&config.ws_url()).unwrap(), "api.openai.com");
        assert_eq!(
            endpoint_host("wss://realtime.example.com/v1?model=m").unwrap(),
            "realtime.example.com"
        );
        assert!(endpoint_host("not a url").is_err());
    }

    #[tokio::test]
    async fn test_connect_requires_api_key() {
        let config = RealtimeConfig::default();
        let result = ModelConnection::connect(&config).await;
        assert!(matches!(
            result,
            Err(RealtimeError::AuthenticationFailed(_))
        ));
    }
}
