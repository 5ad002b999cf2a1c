use std::future::Future;

use karma_types::events::ChatEvent;
use karma_types::reply::ReplyPayload;

use crate::error::Result;

/// Inbound side of the chat transport.
pub trait EventSource {
    /// Next event, or `None` once the stream has ended.
    fn next_event(&mut self) -> impl Future<Output = Option<ChatEvent>> + Send;
}

/// Outbound side of the chat transport.
pub trait ReplySink: Send + Sync + 'static {
    /// Post one reply. Failures come back as [`EngineError::Delivery`].
    ///
    /// [`EngineError::Delivery`]: crate::error::EngineError::Delivery
    fn post(&self, reply: &ReplyPayload) -> impl Future<Output = Result<()>> + Send;
}
