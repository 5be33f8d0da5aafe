//! Telephony-side protocol support (Twilio Media Streams).

mod messages;

pub use messages::{
    MARK_NAME, MarkInfo, MediaFrame, MediaPayload, StreamStart, TwilioCommand, TwilioEvent,
};
