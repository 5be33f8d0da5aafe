//! Per-call mutable state for one media relay session.
//!
//! A [`CallSession`] lives exactly as long as its call and is only ever
//! touched from the call's own relay task, so no locking is involved. It
//! tracks the stream handle, the telephony-clock position, which assistant
//! item is currently playing, and the queue of outstanding playback marks:
//! everything the interruption math in [`super::interrupt`] needs.

use std::collections::VecDeque;

use crate::core::telephony::MARK_NAME;

/// State record for one active call.
///
/// Invariants:
/// - `last_assistant_item` and `response_start_timestamp` are set together
///   and cleared together (on interruption or a new stream start).
/// - `mark_queue` holds one entry per audio chunk sent to the phone that
///   Twilio has not yet acknowledged.
#[derive(Debug, Default)]
pub struct CallSession {
    stream_sid: Option<String>,
    latest_media_timestamp: u64,
    last_assistant_item: Option<String>,
    response_start_timestamp: Option<u64>,
    mark_queue: VecDeque<String>,
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream handle assigned by the telephony platform, once known.
    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.as_deref()
    }

    /// Telephony-clock position of the most recent caller audio frame (ms).
    pub fn latest_media_timestamp(&self) -> u64 {
        self.latest_media_timestamp
    }

    /// Item id of the assistant audio currently playing out, if any.
    pub fn last_assistant_item(&self) -> Option<&str> {
        self.last_assistant_item.as_deref()
    }

    /// Telephony-clock timestamp at which the current item began playback.
    pub fn response_start_timestamp(&self) -> Option<u64> {
        self.response_start_timestamp
    }

    /// Number of forwarded audio chunks Twilio has not yet acknowledged.
    pub fn marks_outstanding(&self) -> usize {
        self.mark_queue.len()
    }

    /// Whether a model response is mid-playback.
    pub fn has_active_item(&self) -> bool {
        self.last_assistant_item.is_some()
    }

    /// A new media stream started: capture the handle and reset all
    /// playback bookkeeping from any previous stream.
    pub fn stream_started(&mut self, stream_sid: String) {
        self.stream_sid = Some(stream_sid);
        self.latest_media_timestamp = 0;
        self.last_assistant_item = None;
        self.response_start_timestamp = None;
        self.mark_queue.clear();
    }

    /// Record the timestamp of an inbound caller audio frame.
    pub fn media_received(&mut self, timestamp: u64) {
        self.latest_media_timestamp = timestamp;
    }

    /// Twilio acknowledged playback progress: retire the oldest mark.
    /// No-op when nothing is outstanding.
    pub fn mark_acked(&mut self) {
        self.mark_queue.pop_front();
    }

    /// Note that an assistant audio chunk for `item_id` was forwarded.
    ///
    /// When the item differs from the one currently playing this is the
    /// start of a new spoken item: playback is considered to begin at the
    /// current telephony-clock position. Returns true in that case.
    pub fn audio_forwarded(&mut self, item_id: &str) -> bool {
        if self.last_assistant_item.as_deref() != Some(item_id) {
            self.response_start_timestamp = Some(self.latest_media_timestamp);
            self.last_assistant_item = Some(item_id.to_string());
            true
        } else {
            false
        }
    }

    /// Record that a playback mark was emitted to the phone.
    pub fn mark_sent(&mut self) {
        self.mark_queue.push_back(MARK_NAME.to_string());
    }

    /// Clear all playback bookkeeping. Used by the interruption path; the
    /// stream handle and media clock survive.
    pub fn reset_playback(&mut self) {
        self.mark_queue.clear();
        self.last_assistant_item = None;
        self.response_start_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_start_resets_state() {
        let mut session = CallSession::new();
        session.media_received(500);
        session.audio_forwarded("it0");
        session.mark_sent();

        session.stream_started("MZ0001".to_string());
        assert_eq!(session.stream_sid(), Some("MZ0001"));
        assert_eq!(session.latest_media_timestamp(), 0);
        assert!(!session.has_active_item());
        assert_eq!(session.response_start_timestamp(), None);
        assert_eq!(session.marks_outstanding(), 0);
    }

    #[test]
    fn test_media_updates_clock() {
        let mut session = CallSession::new();
        session.media_received(100);
        session.media_received(260);
        assert_eq!(session.latest_media_timestamp(), 260);
    }

    #[test]
    fn test_new_item_captures_playback_start() {
        let mut session = CallSession::new();
        session.media_received(2000);

        assert!(session.audio_forwarded("it1"));
        assert_eq!(session.last_assistant_item(), Some("it1"));
        assert_eq!(session.response_start_timestamp(), Some(2000));

        // Later chunks of the same item keep the original start time.
        session.media_received(2600);
        assert!(!session.audio_forwarded("it1"));
        assert_eq!(session.response_start_timestamp(), Some(2000));

        // A different item re-anchors playback start.
        assert!(session.audio_forwarded("it2"));
        assert_eq!(session.response_start_timestamp(), Some(2600));
    }

    #[test]
    fn test_mark_queue_counts_unacked_chunks() {
        let mut session = CallSession::new();
        for _ in 0..5 {
            session.mark_sent();
        }
        assert_eq!(session.marks_outstanding(), 5);

        for expected in [4, 3].into_iter() {
            session.mark_acked();
            assert_eq!(session.marks_outstanding(), expected);
        }
    }

    #[test]
    fn test_mark_ack_on_empty_queue_is_noop() {
        let mut session = CallSession::new();
        session.mark_acked();
        assert_eq!(session.marks_outstanding(), 0);
    }

    #[test]
    fn test_reset_playback_keeps_stream_and_clock() {
        let mut session = CallSession::new();
        session.stream_started("MZ0001".to_string());
        session.media_received(5000);
        session.audio_forwarded("it1");
        session.mark_sent();

        session.reset_playback();
        assert!(!session.has_active_item());
        assert_eq!(session.response_start_timestamp(), None);
        assert_eq!(session.marks_outstanding(), 0);
        assert_eq!(session.stream_sid(), Some("MZ0001"));
        assert_eq!(session.latest_media_timestamp(), 5000);
    }
}
