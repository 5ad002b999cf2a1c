use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use karma_engine::transport::EventSource;
use karma_types::events::ChatEvent;

use crate::error::TransportError;

/// Reads JSON-encoded [`ChatEvent`]s from a WebSocket gateway.
pub struct WsEventSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsEventSource {
    /// Connect and authenticate with a bearer token. A 401/403 on the
    /// handshake is reported as [`TransportError::InvalidAuth`].
    pub async fn connect(url: &str, token: &str) -> Result<Self, TransportError> {
        let mut request = url.into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| TransportError::InvalidToken)?;
        request.headers_mut().insert(header::AUTHORIZATION, auth);

        let (stream, response) = match connect_async(request).await {
            Ok(ok) => ok,
            Err(tungstenite::Error::Http(response))
                if matches!(
                    response.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                return Err(TransportError::InvalidAuth);
            }
            Err(e) => return Err(e.into()),
        };

        info!("Connected to gateway {} ({})", url, response.status());
        Ok(Self { stream })
    }
}

impl EventSource for WsEventSource {
    async fn next_event(&mut self) -> Option<ChatEvent> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => match parse_event(&text) {
                    Some(event) => return Some(event),
                    None => continue,
                },
                Ok(Message::Close(frame)) => {
                    info!("Gateway closed the connection: {:?}", frame);
                    return None;
                }
                // Pings are answered by tungstenite itself
                Ok(_) => continue,
                Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ) => return None,
                Err(e) => {
                    return Some(ChatEvent::TransportError {
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Decode one text frame. Malformed frames are logged and skipped.
fn parse_event(text: &str) -> Option<ChatEvent> {
    match serde_json::from_str::<ChatEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            let preview: String = text.chars().take(200).collect();
            warn!("Bad gateway frame: {} -- raw: {}", e, preview);
            debug!("Full frame: {}", text);
            None
        }
    }
}
