//! Core bridge logic: protocol types for both transports and the per-call
//! relay state machine.

pub mod realtime;
pub mod relay;
pub mod telephony;
