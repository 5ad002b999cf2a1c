use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use karma_types::events::ChatEvent;
use karma_types::models::{Message, UserInfo};
use karma_types::reply::ReplyPayload;

use crate::commands::{self, CommandRequest, Snapshot};
use crate::error::{EngineError, Result};
use crate::ledger::MessageLedger;
use crate::reaction;
use crate::registry::UserRegistry;
use crate::transport::{EventSource, ReplySink};

/// What to do with a reply the sink keeps rejecting.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Wait before retry `n` is `backoff * n`
    pub backoff: Duration,
    /// Stop the whole pipeline instead of dropping the reply
    pub fatal: bool,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(500),
            fatal: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of the queue between the command worker and delivery
    pub reply_queue: usize,
    pub delivery: DeliveryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reply_queue: 64,
            delivery: DeliveryPolicy::default(),
        }
    }
}

/// Outcome of feeding one event to the [`Engine`].
#[derive(Debug)]
pub enum Step {
    Continue,
    /// A directed message to hand to the command worker
    Dispatch(CommandRequest),
    /// The transport rejected our credentials
    Stop,
}

/// Owner of all reputation state. Only the ingestion loop holds one, so every
/// write goes through [`Engine::handle`].
#[derive(Debug, Default)]
pub struct Engine {
    bot_id: Option<String>,
    users: UserRegistry,
    messages: MessageLedger,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn messages(&self) -> &MessageLedger {
        &self.messages
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.clone(),
            messages: self.messages.clone(),
        }
    }

    pub fn handle(&mut self, event: ChatEvent) -> Step {
        match event {
            ChatEvent::Connected { self_id, users } => {
                let total = users.len();
                let mut added = 0;
                for user in users {
                    if !user.real_name.is_empty() && self.users.register(user) {
                        added += 1;
                    }
                }
                info!(
                    "Connected as {} ({} of {} users registered)",
                    self_id, added, total
                );
                self.bot_id = Some(self_id);
                Step::Continue
            }

            ChatEvent::TeamJoin { user } => {
                self.team_join(user);
                Step::Continue
            }

            ChatEvent::Message {
                channel,
                user,
                ts,
                text,
            } => self.message(channel, user, ts, text),

            ChatEvent::ReactionAdded {
                reaction,
                item_user,
                item,
                ..
            } => {
                reaction::apply(
                    &mut self.messages,
                    &mut self.users,
                    &reaction,
                    &item,
                    &item_user,
                    true,
                );
                Step::Continue
            }

            ChatEvent::ReactionRemoved {
                reaction,
                item_user,
                item,
                ..
            } => {
                reaction::apply(
                    &mut self.messages,
                    &mut self.users,
                    &reaction,
                    &item,
                    &item_user,
                    false,
                );
                Step::Continue
            }

            ChatEvent::TransportError { message } => {
                warn!("Transport error: {}", message);
                Step::Continue
            }

            ChatEvent::InvalidAuth => {
                error!("Invalid credentials, stopping event loop");
                Step::Stop
            }

            ChatEvent::Unknown => {
                trace!("Ignoring unrecognized event");
                Step::Continue
            }
        }
    }

    fn team_join(&mut self, user: UserInfo) {
        let id = user.id.clone();
        if self.users.register(user) {
            info!("{} joined the workspace", id);
        }
    }

    fn message(&mut self, channel: String, user: String, ts: String, text: String) -> Step {
        let directed = self
            .bot_id
            .as_ref()
            .is_some_and(|bot| is_addressed_to(&text, bot));

        let step = if directed {
            Step::Dispatch(CommandRequest::new(&channel, &user, &text, self.snapshot()))
        } else {
            Step::Continue
        };

        if self.bot_id.as_deref() != Some(user.as_str()) {
            let author = self.users.find_or_placeholder(&user);
            self.messages.append(Message {
                channel_id: channel,
                ts,
                text,
                score: 0,
                author,
            });
        }

        step
    }
}

/// True if `text` opens with a mention of `bot_id`, e.g. `<@U123> top 5`.
pub fn is_addressed_to(text: &str, bot_id: &str) -> bool {
    text.strip_prefix("<@")
        .and_then(|rest| rest.strip_prefix(bot_id))
        .is_some_and(|rest| rest.starts_with('>'))
}

/// Run the pipeline until the source ends or reports invalid credentials.
///
/// The calling task becomes the ingestion loop. Command interpretation and
/// reply delivery each get their own task; requests cross over on an
/// unbounded queue so ingestion never waits on them. On shutdown both tasks
/// are drained and the final engine state is returned.
pub async fn run<E, S>(mut source: E, sink: S, config: PipelineConfig) -> Result<Engine>
where
    E: EventSource,
    S: ReplySink,
{
    let (request_tx, request_rx) = mpsc::unbounded_channel::<CommandRequest>();
    let (reply_tx, reply_rx) = mpsc::channel::<ReplyPayload>(config.reply_queue.max(1));

    let commands = tokio::spawn(run_commands(request_rx, reply_tx));
    let mut delivery = tokio::spawn(run_delivery(reply_rx, sink, config.delivery));

    let mut engine = Engine::new();

    let delivery_ended = loop {
        tokio::select! {
            event = source.next_event() => {
                let Some(event) = event else {
                    info!("Event source closed");
                    break None;
                };
                match engine.handle(event) {
                    Step::Continue => {}
                    Step::Dispatch(request) => {
                        if request_tx.send(request).is_err() {
                            warn!("Command worker is gone, stopping event loop");
                            break None;
                        }
                    }
                    Step::Stop => break None,
                }
            }
            result = &mut delivery => break Some(result),
        }
    };

    drop(request_tx);
    let commands_result = commands.await;
    let delivery_result = match delivery_ended {
        Some(result) => result,
        None => delivery.await,
    };

    delivery_result??;
    commands_result??;
    Ok(engine)
}

async fn run_commands(
    mut requests: mpsc::UnboundedReceiver<CommandRequest>,
    replies: mpsc::Sender<ReplyPayload>,
) -> Result<()> {
    while let Some(request) = requests.recv().await {
        debug!(
            "Command {:?} from {} in {}",
            request.verb().unwrap_or_default(),
            request.user_id,
            request.channel
        );
        match commands::interpret(&request) {
            Some(reply) => {
                replies
                    .send(reply)
                    .await
                    .map_err(|_| EngineError::ChannelClosed("reply"))?;
            }
            None => debug!("No reply for {:?}", request.tokens),
        }
    }
    Ok(())
}

async fn run_delivery<S: ReplySink>(
    mut replies: mpsc::Receiver<ReplyPayload>,
    sink: S,
    policy: DeliveryPolicy,
) -> Result<()> {
    while let Some(reply) = replies.recv().await {
        if let Err(e) = deliver(&sink, &reply, &policy).await {
            if policy.fatal {
                error!("Giving up on reply to {}: {}", reply.channel, e);
                return Err(e);
            }
            error!("Dropping reply to {}: {}", reply.channel, e);
        }
    }
    Ok(())
}

async fn deliver<S: ReplySink>(sink: &S, reply: &ReplyPayload, policy: &DeliveryPolicy) -> Result<()> {
    let mut attempt = 0;
    loop {
        match sink.post(reply).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                warn!(
                    "Post to {} failed (attempt {}): {}",
                    reply.channel, attempt, e
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karma_types::events::ReactionItem;

    fn info(id: &str, real_name: &str) -> UserInfo {
        UserInfo {
            id: id.into(),
            name: id.to_lowercase(),
            real_name: real_name.into(),
        }
    }

    fn connected(engine: &mut Engine) {
        engine.handle(ChatEvent::Connected {
            self_id: "BOT".into(),
            users: vec![info("A", "Alice"), info("BOT", ""), info("B", "Bob")],
        });
    }

    fn message(user: &str, ts: &str, text: &str) -> ChatEvent {
        ChatEvent::Message {
            channel: "C1".into(),
            user: user.into(),
            ts: ts.into(),
            text: text.into(),
        }
    }

    #[test]
    fn test_addressed_prefix() {
        assert!(is_addressed_to("<@BOT> top 5", "BOT"));
        assert!(is_addressed_to("<@BOT>", "BOT"));
        assert!(!is_addressed_to("<@BOTX> top 5", "BOT"));
        assert!(!is_addressed_to("hey <@BOT> top 5", "BOT"));
        assert!(!is_addressed_to("top 5", "BOT"));
    }

    #[test]
    fn test_connected_skips_nameless_users() {
        let mut engine = Engine::new();
        connected(&mut engine);
        assert_eq!(engine.bot_id(), Some("BOT"));
        assert_eq!(engine.users().len(), 2);
        assert!(engine.users().find("BOT").is_none());

        // reconnect does not duplicate
        connected(&mut engine);
        assert_eq!(engine.users().len(), 2);
    }

    #[test]
    fn test_team_join_registers_even_without_name() {
        let mut engine = Engine::new();
        connected(&mut engine);
        engine.handle(ChatEvent::TeamJoin { user: info("N", "") });
        assert!(engine.users().find("N").is_some());
    }

    #[test]
    fn test_messages_and_commands() {
        let mut engine = Engine::new();
        connected(&mut engine);

        assert!(matches!(
            engine.handle(message("A", "1.0", "hello")),
            Step::Continue
        ));
        let step = engine.handle(message("B", "2.0", "<@BOT> top 3"));
        let Step::Dispatch(request) = step else {
            panic!("expected dispatch");
        };
        assert_eq!(request.verb(), Some("top"));
        assert_eq!(request.user_id, "B");
        // snapshot taken before the command itself was logged
        assert_eq!(request.snapshot.messages.len(), 1);

        // bot's own messages are not logged
        engine.handle(message("BOT", "3.0", "Top 3"));
        assert_eq!(engine.messages().len(), 2);
        assert_eq!(engine.messages().messages()[0].author.info.real_name, "Alice");
    }

    #[test]
    fn test_no_commands_before_connect() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.handle(message("A", "1.0", "<@BOT> help")),
            Step::Continue
        ));
        assert_eq!(engine.messages().len(), 1);
        assert!(engine.messages().messages()[0].author.is_placeholder());
    }

    #[test]
    fn test_reactions_update_ledger_and_author() {
        let mut engine = Engine::new();
        connected(&mut engine);
        engine.handle(message("A", "1.0", "hello"));

        let item = ReactionItem {
            channel: "C1".into(),
            ts: "1.0".into(),
        };
        engine.handle(ChatEvent::ReactionAdded {
            reaction: "clap".into(),
            user: "B".into(),
            item_user: "A".into(),
            item: item.clone(),
        });
        assert_eq!(engine.messages().messages()[0].score, 1);
        assert_eq!(engine.users().find("A").unwrap().score, 1);

        engine.handle(ChatEvent::ReactionRemoved {
            reaction: "clap".into(),
            user: "B".into(),
            item_user: "A".into(),
            item,
        });
        assert_eq!(engine.messages().messages()[0].score, 0);
        assert_eq!(engine.users().find("A").unwrap().score, 0);
    }

    #[test]
    fn test_stop_and_transient_errors() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.handle(ChatEvent::TransportError {
                message: "socket reset".into()
            }),
            Step::Continue
        ));
        assert!(matches!(engine.handle(ChatEvent::Unknown), Step::Continue));
        assert!(matches!(engine.handle(ChatEvent::InvalidAuth), Step::Stop));
    }

    #[test]
    fn test_queued_commands_stay_cheap_on_a_large_ledger() {
        let mut engine = Engine::new();
        connected(&mut engine);
        for i in 0..20_000 {
            engine.handle(message("A", &format!("{}.0", i), "chatter"));
        }

        // requests are held, as they would be behind a slow sink
        let started = std::time::Instant::now();
        let mut queued = Vec::new();
        for i in 0..1_000 {
            if let Step::Dispatch(request) =
                engine.handle(message("B", &format!("c{}", i), "<@BOT> help"))
            {
                queued.push(request);
            }
        }
        let elapsed = started.elapsed();

        assert_eq!(queued.len(), 1_000);
        assert_eq!(queued[0].snapshot.messages.len(), 20_000);
        assert_eq!(queued[999].snapshot.messages.len(), 20_999);
        assert_eq!(engine.messages().len(), 21_000);
        // a full ledger copy per command would be ~20M message clones
        assert!(
            elapsed < std::time::Duration::from_secs(3),
            "1000 commands took {:?}",
            elapsed
        );
    }
}
