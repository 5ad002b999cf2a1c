use serde::{Deserialize, Serialize};

use crate::models::UserInfo;

/// Events received from the chat transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// Connection established: carries the bot's own identity and a snapshot
    /// of every user known to the workspace.
    Connected { self_id: String, users: Vec<UserInfo> },

    /// A new member joined the workspace
    TeamJoin { user: UserInfo },

    /// A chat message was posted
    Message {
        channel: String,
        user: String,
        ts: String,
        text: String,
    },

    /// A reaction was added to an item
    ReactionAdded {
        reaction: String,
        user: String,
        item_user: String,
        item: ReactionItem,
    },

    /// A reaction was removed from an item
    ReactionRemoved {
        reaction: String,
        user: String,
        item_user: String,
        item: ReactionItem,
    },

    /// Non-fatal transport failure
    TransportError { message: String },

    /// The transport rejected our credentials
    InvalidAuth,

    #[serde(other)]
    Unknown,
}

/// The (channel, timestamp) pair a reaction points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionItem {
    pub channel: String,
    pub ts: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_event_from_json() {
        let raw = r#"{
            "type": "ReactionAdded",
            "data": {
                "reaction": "clap",
                "user": "U2",
                "item_user": "U1",
                "item": { "channel": "C1", "ts": "1500000000.000100" }
            }
        }"#;

        let event: ChatEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            ChatEvent::ReactionAdded {
                reaction: "clap".into(),
                user: "U2".into(),
                item_user: "U1".into(),
                item: ReactionItem {
                    channel: "C1".into(),
                    ts: "1500000000.000100".into(),
                },
            }
        );
    }

    #[test]
    fn test_unrecognized_event_kind() {
        let event: ChatEvent = serde_json::from_str(r#"{"type":"UserTyping"}"#).unwrap();
        assert_eq!(event, ChatEvent::Unknown);
    }

    #[test]
    fn test_invalid_auth_has_no_payload() {
        let event: ChatEvent = serde_json::from_str(r#"{"type":"InvalidAuth"}"#).unwrap();
        assert_eq!(event, ChatEvent::InvalidAuth);
    }
}
