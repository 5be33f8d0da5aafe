//! Bidirectional media relay between a telephony stream and a realtime
//! model transport.
//!
//! [`Relay`] holds the per-call [`CallSession`] and implements the bodies of
//! the two pump loops: [`Relay::on_telephony`] for caller-side events and
//! [`Relay::on_model`] for model-side events. Both are driven from a single
//! task (one `select!` loop per call, see `handlers::media`), so session
//! state needs no lock. Outbound traffic goes through `mpsc` senders drained
//! by per-transport writer tasks; a handler returning `false` means the
//! session is over and both transports should be torn down.
//!
//! Caller audio is never buffered: frames that arrive while the model
//! transport is down are dropped, because late audio is worthless in a live
//! call.

mod interrupt;
mod session;

pub use interrupt::{Interruption, Truncation, interrupt};
pub use session::CallSession;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::core::realtime::{ClientEvent, ServerEvent};
use crate::core::telephony::{TwilioCommand, TwilioEvent};

/// Routed messages for the telephony writer task.
#[derive(Debug)]
pub enum TwilioRoute {
    /// Serialize and send a protocol frame.
    Outgoing(TwilioCommand),
    /// Send a close frame and stop the writer.
    Close,
}

/// Event dispatcher for one call.
pub struct Relay {
    session: CallSession,
    model_tx: mpsc::Sender<ClientEvent>,
    model_open: Arc<AtomicBool>,
    twilio_tx: mpsc::Sender<TwilioRoute>,
}

impl Relay {
    pub fn new(
        model_tx: mpsc::Sender<ClientEvent>,
        model_open: Arc<AtomicBool>,
        twilio_tx: mpsc::Sender<TwilioRoute>,
    ) -> Self {
        Self {
            session: CallSession::new(),
            model_tx,
            model_open,
            twilio_tx,
        }
    }

    /// Current session state (used by teardown logging and tests).
    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Handle one event from the telephony socket.
    ///
    /// Returns `false` when the session should end.
    pub async fn on_telephony(&mut self, event: TwilioEvent) -> bool {
        match event {
            TwilioEvent::Connected { protocol, version } => {
                debug!(?protocol, ?version, "telephony socket connected");
                true
            }

            TwilioEvent::Start { start } => {
                info!(
                    stream_sid = %start.stream_sid,
                    call_sid = ?start.call_sid,
                    "media stream started"
                );
                self.session.stream_started(start.stream_sid);
                true
            }

            TwilioEvent::Media { media } => {
                self.session.media_received(media.timestamp);
                if self.model_open.load(Ordering::SeqCst) {
                    if self
                        .model_tx
                        .send(ClientEvent::audio_append(media.payload))
                        .await
                        .is_err()
                    {
                        warn!("model transport gone while forwarding audio, ending session");
                        return false;
                    }
                } else {
                    trace!("model transport not open, dropping media frame");
                }
                true
            }

            TwilioEvent::Mark { .. } => {
                self.session.mark_acked();
                true
            }

            TwilioEvent::Stop => {
                info!("telephony stream stopped");
                false
            }

            TwilioEvent::Unrecognized => {
                trace!("ignoring unrecognized telephony event");
                true
            }
        }
    }

    /// Handle one event from the model transport.
    ///
    /// Returns `false` when the session should end.
    pub async fn on_model(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::AudioDelta { delta, item_id, .. } => {
                self.forward_audio(delta, item_id).await
            }

            ServerEvent::AudioDone { audio, item_id } => match audio {
                // Non-streaming snapshots deliver the whole clip here.
                Some(audio) => self.forward_audio(audio, item_id).await,
                None => {
                    debug!("assistant audio finished");
                    true
                }
            },

            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!(audio_start_ms, "caller speech detected");
                if self.session.has_active_item() {
                    self.handle_interruption().await
                } else {
                    true
                }
            }

            // Model-reported errors can be transient; the session only ends
            // if the transport itself closes.
            ServerEvent::Error { error } => {
                error!(
                    kind = %error.error_type,
                    code = ?error.code,
                    "model error: {}",
                    error.message
                );
                true
            }

            ServerEvent::SessionCreated { session } => {
                info!(session_id = ?session.id, "model session created");
                true
            }

            ServerEvent::SessionUpdated { session } => {
                debug!(session_id = ?session.id, "model session updated");
                true
            }

            ServerEvent::SpeechStopped { audio_end_ms } => {
                debug!(audio_end_ms, "caller speech ended");
                true
            }

            ServerEvent::InputAudioBufferCommitted { item_id } => {
                debug!(?item_id, "input audio committed");
                true
            }

            ServerEvent::ResponseDone { response } => {
                debug!(response_id = ?response.id, status = ?response.status, "response done");
                true
            }

            ServerEvent::Unrecognized => {
                trace!("ignoring unrecognized model event");
                true
            }
        }
    }

    /// Forward one chunk of assistant audio to the phone and emit the
    /// playback mark that tracks it.
    async fn forward_audio(&mut self, payload: String, item_id: Option<String>) -> bool {
        let Some(stream_sid) = self.session.stream_sid().map(str::to_string) else {
            debug!("assistant audio before stream start, dropping");
            return true;
        };

        if self
            .twilio_tx
            .send(TwilioRoute::Outgoing(TwilioCommand::media(
                stream_sid.clone(),
                payload,
            )))
            .await
            .is_err()
        {
            warn!("telephony transport gone while forwarding audio, ending session");
            return false;
        }

        if let Some(item_id) = item_id
            && self.session.audio_forwarded(&item_id)
        {
            debug!(
                item_id = %item_id,
                response_start_ms = ?self.session.response_start_timestamp(),
                "assistant item playback started"
            );
        }

        if self
            .twilio_tx
            .send(TwilioRoute::Outgoing(TwilioCommand::mark(stream_sid)))
            .await
            .is_err()
        {
            return false;
        }
        self.session.mark_sent();
        true
    }

    /// Barge-in: truncate the model's in-flight item, flush the phone's
    /// playback buffer, reset playback state.
    async fn handle_interruption(&mut self) -> bool {
        let interruption = interrupt(&mut self.session);

        if let Some(truncation) = interruption.truncate {
            info!(
                item_id = %truncation.item_id,
                audio_end_ms = truncation.audio_end_ms,
                "caller barge-in, truncating assistant item"
            );
            if self
                .model_tx
                .send(ClientEvent::ConversationItemTruncate {
                    item_id: truncation.item_id,
                    content_index: truncation.content_index,
                    audio_end_ms: truncation.audio_end_ms,
                })
                .await
                .is_err()
            {
                warn!("model transport gone while truncating, ending session");
                return false;
            }
        }

        if let Some(stream_sid) = interruption.clear_stream_sid
            && self
                .twilio_tx
                .send(TwilioRoute::Outgoing(TwilioCommand::clear(stream_sid)))
                .await
                .is_err()
        {
            return false;
        }

        true
    }
}

// =============================================================================
// Tests
// =============================================================================
