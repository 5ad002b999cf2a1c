//! Karma Engine
//!
//! Reputation tracking for a chat workspace: reactions on messages move the
//! author's score, and directed commands rank users and messages by score.
//!
//! All state lives in one ingestion loop ([`pipeline::Engine`]). Commands are
//! answered on a separate task from snapshots, and replies are posted on a
//! third, so a slow sink never holds up event processing.

pub mod commands;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod reaction;
pub mod registry;
pub mod transport;
