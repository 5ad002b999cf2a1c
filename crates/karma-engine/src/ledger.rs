use im::{HashMap, Vector};
use karma_types::models::Message;

/// Append-only log of observed messages.
///
/// Shares storage between clones the same way [`UserRegistry`] does.
///
/// [`UserRegistry`]: crate::registry::UserRegistry
#[derive(Debug, Clone, Default)]
pub struct MessageLedger {
    messages: Vector<Message>,
    /// (channel, ts) -> position of the first message with that key
    index: HashMap<(String, String), usize>,
}

impl MessageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &Vector<Message> {
        &self.messages
    }

    pub fn append(&mut self, message: Message) {
        let idx = self.messages.len();
        self.index
            .entry((message.channel_id.clone(), message.ts.clone()))
            .or_insert(idx);
        self.messages.push_back(message);
    }

    /// Apply `delta` to the first message matching both keys.
    pub fn adjust_score(&mut self, channel_id: &str, ts: &str, delta: i64) -> bool {
        let key = (channel_id.to_string(), ts.to_string());
        let Some(message) = self.index.get(&key).and_then(|&idx| self.messages.get_mut(idx)) else {
            return false;
        };
        message.score += delta;
        true
    }

    pub fn get(&self, channel_id: &str, ts: &str) -> Option<&Message> {
        self.index
            .get(&(channel_id.to_string(), ts.to_string()))
            .and_then(|&idx| self.messages.get(idx))
    }

    /// Up to `n` messages, highest score first, ties in arrival order.
    pub fn top_by_score(&self, n: usize) -> Vec<Message> {
        let mut sorted: Vec<Message> = self.messages.iter().cloned().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        sorted.truncate(n);
        sorted
    }
}
