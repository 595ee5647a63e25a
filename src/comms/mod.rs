//! Comms Module
//!
//! Outbound notifications. Telegram only, for now.

pub mod telegram;
