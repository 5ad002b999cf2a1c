use serde::{Deserialize, Serialize};

/// Title shown above every reply the bot posts.
pub const DISPLAY_TITLE: &str = "Fortune & Karam with Luck";

/// A reply destined for a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub channel: String,
    pub title: String,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub pretext: String,
    pub color: String,
    pub fields: Vec<ReplyField>,
}

/// One ranked entry. `short` is a layout hint: short fields may be rendered
/// side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl ReplyField {
    pub fn new(title: impl Into<String>, value: impl Into<String>, short: bool) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short,
        }
    }
}
