use karma_types::events::ReactionItem;
use karma_types::models::Sentiment;
use tracing::trace;

use crate::ledger::MessageLedger;
use crate::registry::UserRegistry;

/// Reaction names that count against the author. Anything else counts in
/// their favour.
pub const NEGATIVE_REACTIONS: &[&str] = &[
    "-1",
    "hankey",
    "disappointed",
    "disappointed_relieved",
    "confused",
    "expressionless",
    "rage",
    "rage1",
    "rage2",
    "rage3",
    "rage4",
];

pub fn classify(reaction: &str) -> Sentiment {
    if NEGATIVE_REACTIONS.contains(&reaction) {
        Sentiment::Negative
    } else {
        Sentiment::Positive
    }
}

/// Score change for a reaction. Removal undoes the matching addition.
pub fn delta(reaction: &str, added: bool) -> i64 {
    let base = match classify(reaction) {
        Sentiment::Positive => 1,
        Sentiment::Negative => -1,
    };
    if added { base } else { -base }
}

/// Apply a reaction to the ledger entry at `item` and to `item_user`.
///
/// `item_user` is whatever the event claims authored the item; it is not
/// checked against the ledger entry's stored author. The two updates are
/// independent: a miss on one does not skip the other.
pub fn apply(
    ledger: &mut MessageLedger,
    registry: &mut UserRegistry,
    reaction: &str,
    item: &ReactionItem,
    item_user: &str,
    added: bool,
) {
    let delta = delta(reaction, added);
    let message_hit = ledger.adjust_score(&item.channel, &item.ts, delta);
    let user_hit = registry.adjust(item_user, delta);
    trace!(
        "reaction {} ({}) delta {} on {}/{} by {}: message_hit={} user_hit={}",
        reaction,
        if added { "added" } else { "removed" },
        delta,
        item.channel,
        item.ts,
        item_user,
        message_hit,
        user_hit
    );
}
