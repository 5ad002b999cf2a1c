use serde::{Deserialize, Serialize};

/// Workspace member as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Stable id, e.g. `U024BE7LH`
    pub id: String,
    /// Short handle
    #[serde(default)]
    pub name: String,
    /// Display name
    #[serde(default)]
    pub real_name: String,
}

/// A tracked user and their reputation score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub info: UserInfo,
    pub score: i64,
}

impl User {
    pub fn new(info: UserInfo) -> Self {
        Self { info, score: 0 }
    }

    /// True for the placeholder returned on a lookup miss.
    pub fn is_placeholder(&self) -> bool {
        self.info.id.is_empty()
    }
}

/// A message observed in a channel. `ts` is unique per channel and is what
/// reactions refer back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub channel_id: String,
    pub ts: String,
    pub text: String,
    pub score: i64,
    /// Author as seen when the message arrived; not updated afterwards.
    pub author: User,
}

/// Reaction sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
}
