//! Chat transport adapters: events in over a WebSocket, replies out over HTTP.

pub mod error;
pub mod http;
pub mod ws;
