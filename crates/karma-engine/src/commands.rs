//! Directed-command parsing and reply rendering.
//!
//! Commands arrive as whitespace-separated tokens where token 0 is the
//! address (the bot mention) and token 1 selects the verb. Interpretation is
//! stateless: each request is answered from a [`Snapshot`] of the registry and
//! ledger taken when the request was queued.

use karma_types::models::User;
use karma_types::reply::{Attachment, DISPLAY_TITLE, ReplyField, ReplyPayload};

use crate::ledger::MessageLedger;
use crate::registry::UserRegistry;

/// Upper bound for `top N` and `bottom N`.
pub const MAX_TOP: usize = 20;

/// How many messages `top <non-numeric>` lists.
pub const TOP_MESSAGES: usize = 5;

const HELP_COLOR: &str = "#B733FF";
const TOP_COLOR: &str = "#36a34f";
const BOTTOM_COLOR: &str = "#b01408";
const INFO_COLOR: &str = "#0a84c1";

/// Verbs listed by `help`, in display order.
pub const HELP: &[(&str, &str)] = &[
    (
        "top",
        "See the top rank of user rating by a provided number of top spots.",
    ),
    (
        "bottom",
        "See the bottom rank of user rating by a provided number of bottom spots.",
    ),
    ("help", "See the available bot commands."),
    (
        "mean",
        "See how your rating looks compared to the mean of all users.",
    ),
    (
        "mean of",
        "See how the rating of the selected user looks compared to the mean of all users.",
    ),
    (
        "top messages",
        "See the top ranking messages. Use `top` with any non-numeric argument.",
    ),
];

/// A directed message waiting to be interpreted.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub channel: String,
    /// Stable id of the user who issued the command
    pub user_id: String,
    pub tokens: Vec<String>,
    pub snapshot: Snapshot,
}

impl CommandRequest {
    pub fn new(channel: &str, user_id: &str, text: &str, snapshot: Snapshot) -> Self {
        Self {
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            tokens: text.split_whitespace().map(str::to_string).collect(),
            snapshot,
        }
    }

    pub fn verb(&self) -> Option<&str> {
        self.tokens.get(1).map(String::as_str)
    }
}

/// Read-only view of engine state at the time a request was queued.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: UserRegistry,
    pub messages: MessageLedger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    TopUsers(usize),
    TopMessages,
    BottomUsers(usize),
    /// Compare the invoking user against the mean
    Mean,
    /// Compare the named identity against the mean
    MeanOf(String),
}

impl Command {
    /// Parse command tokens. `None` means the request gets no reply: unknown
    /// verb, missing argument, or a count outside `1..=MAX_TOP`.
    pub fn parse(tokens: &[String]) -> Option<Self> {
        let verb = tokens.get(1)?;
        match verb.as_str() {
            "help" => Some(Self::Help),
            "top" => {
                let arg = tokens.get(2)?;
                match arg.parse::<i64>() {
                    Ok(n) => in_range(n).map(Self::TopUsers),
                    Err(_) => Some(Self::TopMessages),
                }
            }
            "bottom" => {
                let n = tokens.get(2)?.parse::<i64>().ok()?;
                in_range(n).map(Self::BottomUsers)
            }
            "mean" => match tokens.len() {
                2 => Some(Self::Mean),
                n if n > 3 && tokens[2] == "of" => {
                    Some(Self::MeanOf(strip_mention(&tokens[3..].join(" ")).to_string()))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

fn in_range(n: i64) -> Option<usize> {
    usize::try_from(n)
        .ok()
        .filter(|n| (1..=MAX_TOP).contains(n))
}

/// `<@U123>` and `<@U123|name>` resolve to `U123`; anything else is returned as is.
fn strip_mention(identity: &str) -> &str {
    identity
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|id| id.split('|').next().unwrap_or(id))
        .unwrap_or(identity)
}

/// Produce the reply for one request, if any.
pub fn interpret(request: &CommandRequest) -> Option<ReplyPayload> {
    let command = Command::parse(&request.tokens)?;
    let snapshot = &request.snapshot;

    let attachment = match command {
        Command::Help => help(),
        Command::TopUsers(n) => top_users(&snapshot.users, n),
        Command::TopMessages => top_messages(&snapshot.messages),
        Command::BottomUsers(n) => bottom_users(&snapshot.users, n),
        Command::Mean => mean_of(&snapshot.users, &request.user_id),
        Command::MeanOf(identity) => mean_of(&snapshot.users, &identity),
    };

    Some(ReplyPayload {
        channel: request.channel.clone(),
        title: DISPLAY_TITLE.to_string(),
        attachment,
    })
}

fn help() -> Attachment {
    Attachment {
        pretext: "Guru Command List".into(),
        color: HELP_COLOR.into(),
        fields: HELP
            .iter()
            .map(|(verb, desc)| ReplyField::new(format!("<bot> {}", verb), *desc, false))
            .collect(),
    }
}

fn user_field(user: &User) -> ReplyField {
    ReplyField::new(
        format!("{} :star:", user.score),
        user.info.real_name.clone(),
        false,
    )
}

fn top_users(users: &UserRegistry, n: usize) -> Attachment {
    Attachment {
        pretext: format!("Top {}", n),
        color: TOP_COLOR.into(),
        fields: users.ranked_descending().iter().take(n).map(user_field).collect(),
    }
}

fn bottom_users(users: &UserRegistry, n: usize) -> Attachment {
    Attachment {
        pretext: format!("Bottom {}", n),
        color: BOTTOM_COLOR.into(),
        fields: users
            .ranked_descending()
            .iter()
            .rev()
            .take(n)
            .map(user_field)
            .collect(),
    }
}

fn top_messages(messages: &MessageLedger) -> Attachment {
    Attachment {
        pretext: "Top Messages".into(),
        color: INFO_COLOR.into(),
        fields: messages
            .top_by_score(TOP_MESSAGES)
            .into_iter()
            .map(|m| {
                ReplyField::new(
                    format!("Score {} from {}", m.score, m.author.info.real_name),
                    m.text,
                    false,
                )
            })
            .collect(),
    }
}

fn mean_of(users: &UserRegistry, identity: &str) -> Attachment {
    let user = users.find_or_placeholder(identity);
    let mean = match users.mean_score() {
        Some(mean) => format!("{:6.3}", mean),
        None => "n/a".to_string(),
    };
    Attachment {
        pretext: user.info.real_name.clone(),
        color: INFO_COLOR.into(),
        fields: vec![
            ReplyField::new("Score", user.score.to_string(), true),
            ReplyField::new("Company Mean Score", mean, true),
        ],
    }
}
