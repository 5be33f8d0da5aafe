//! Barge-in handling.
//!
//! When the model reports caller speech while an assistant item is still
//! playing, the relay must stop that item everywhere at once: rewind the
//! model's record of it to what the caller actually heard, flush audio
//! Twilio has buffered but not yet played, and forget the playback
//! bookkeeping. [`interrupt`] computes all of that in one step against the
//! session state; the relay then issues the resulting commands.

use super::session::CallSession;

/// Truncate command parameters for the model transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// Item to rewind
    pub item_id: String,
    /// Content index within the item (always the first part)
    pub content_index: u32,
    /// Playback time actually heard, in telephony-clock milliseconds
    pub audio_end_ms: u64,
}

/// Commands produced by one interruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    /// Truncate to send to the model; absent when no item was active.
    pub truncate: Option<Truncation>,
    /// Stream whose telephony playback buffer must be flushed.
    pub clear_stream_sid: Option<String>,
}

/// Apply an interruption to the session.
///
/// The truncation offset is the elapsed playback time of the current item:
/// `latest_media_timestamp - response_start_timestamp`, saturating at zero
/// (both stamps come from the telephony clock). Buffer flush and state reset
/// happen unconditionally, every time this runs; only the truncate command
/// is skipped when no item is mid-playback.
pub fn interrupt(session: &mut CallSession) -> Interruption {
    let truncate = match (
        session.last_assistant_item(),
        session.response_start_timestamp(),
    ) {
        (Some(item_id), Some(start)) => Some(Truncation {
            item_id: item_id.to_string(),
            content_index: 0,
            audio_end_ms: session.latest_media_timestamp().saturating_sub(start),
        }),
        _ => None,
    };

    let clear_stream_sid = session.stream_sid().map(str::to_string);
    session.reset_playback();

    Interruption {
        truncate,
        clear_stream_sid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_session() -> CallSession {
        let mut session = CallSession::new();
        session.stream_started("MZ0001".to_string());
        session.media_received(2000);
        session.audio_forwarded("it1");
        session.mark_sent();
        session
    }

    #[test]
    fn test_elapsed_is_clock_difference() {
        let mut session = playing_session();
        session.media_received(5000);

        let result = interrupt(&mut session);
        assert_eq!(
            result.truncate,
            Some(Truncation {
                item_id: "it1".to_string(),
                content_index: 0,
                audio_end_ms: 3000,
            })
        );
        assert_eq!(result.clear_stream_sid.as_deref(), Some("MZ0001"));
    }

    #[test]
    fn test_elapsed_is_zero_when_interrupted_immediately() {
        let mut session = CallSession::new();
        session.stream_started("MZ0001".to_string());
        session.media_received(2000);
        session.audio_forwarded("it1");

        let result = interrupt(&mut session);
        assert_eq!(result.truncate.unwrap().audio_end_ms, 0);
    }

    #[test]
    fn test_no_truncate_without_active_item() {
        let mut session = CallSession::new();
        session.stream_started("MZ0001".to_string());
        session.media_received(4000);
        session.mark_sent();

        let result = interrupt(&mut session);
        assert_eq!(result.truncate, None);
        // Flush still happens.
        assert_eq!(result.clear_stream_sid.as_deref(), Some("MZ0001"));
        assert_eq!(session.marks_outstanding(), 0);
    }

    #[test]
    fn test_state_reset_is_unconditional() {
        let mut session = playing_session();
        session.media_received(5000);
        interrupt(&mut session);

        assert!(!session.has_active_item());
        assert_eq!(session.response_start_timestamp(), None);
        assert_eq!(session.marks_outstanding(), 0);

        // Running again with nothing playing still resets cleanly.
        session.mark_sent();
        let again = interrupt(&mut session);
        assert_eq!(again.truncate, None);
        assert_eq!(session.marks_outstanding(), 0);
    }

    #[test]
    fn test_truncate_sent_even_with_empty_mark_queue() {
        let mut session = CallSession::new();
        session.stream_started("MZ0001".to_string());
        session.media_received(1000);
        session.audio_forwarded("it9");
        // No marks outstanding; the active item must still be truncated.
        let result = interrupt(&mut session);
        assert_eq!(result.truncate.unwrap().item_id, "it9");
    }
}
