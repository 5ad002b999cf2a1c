use serde::{Deserialize, Serialize};
use tracing::debug;

use karma_engine::error::{EngineError, Result};
use karma_engine::transport::ReplySink;
use karma_types::reply::{Attachment, ReplyPayload};

use crate::error::TransportError;

/// Posts replies as `chat.postMessage` calls.
#[derive(Clone)]
pub struct HttpReplySink {
    client: reqwest::Client,
    url: String,
    token: String,
}

/// Request body for `chat.postMessage`.
#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    as_user: bool,
    attachments: [&'a Attachment; 1],
}

impl<'a> From<&'a ReplyPayload> for PostMessage<'a> {
    fn from(reply: &'a ReplyPayload) -> Self {
        Self {
            channel: &reply.channel,
            text: &reply.title,
            as_user: true,
            attachments: [&reply.attachment],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiAck {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl HttpReplySink {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/chat.postMessage", api_url.trim_end_matches('/')),
            token: token.to_string(),
        }
    }

    async fn send(&self, reply: &ReplyPayload) -> std::result::Result<(), TransportError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&PostMessage::from(reply))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Api(format!("HTTP {}", status)));
        }

        let ack: ApiAck = resp.json().await?;
        check_ack(ack)?;
        debug!("Posted reply to {}", reply.channel);
        Ok(())
    }
}

fn check_ack(ack: ApiAck) -> std::result::Result<(), TransportError> {
    if ack.ok {
        Ok(())
    } else {
        Err(TransportError::Api(
            ack.error.unwrap_or_else(|| "unknown error".into()),
        ))
    }
}

impl ReplySink for HttpReplySink {
    async fn post(&self, reply: &ReplyPayload) -> Result<()> {
        self.send(reply)
            .await
            .map_err(|e| EngineError::Delivery(e.to_string()))
    }
}
