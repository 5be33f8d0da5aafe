//! Request handlers.

pub mod api;
pub mod media;
pub mod twiml;
