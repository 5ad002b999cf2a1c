use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The gateway refused the bot token
    #[error("invalid credentials")]
    InvalidAuth,

    #[error("token is not a valid header value")]
    InvalidToken,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered but reported a failure
    #[error("api error: {0}")]
    Api(String),
}
