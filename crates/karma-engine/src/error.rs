use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The reply sink rejected a post
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The task on the other end of a pipeline queue went away
    #[error("{0} queue closed")]
    ChannelClosed(&'static str),

    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
