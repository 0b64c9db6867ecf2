//! Conversation list derived from the flat message feed.
//!
//! Ordering rules:
//! - one entry per counterparty, holding the message with the greatest `createdAt`;
//! - on equal timestamps the message seen first in the feed is kept;
//! - records without a timestamp count as 0 and therefore sort last;
//! - the final list is newest first, stable for equal timestamps.

use crate::api::models::{Conversation, Message};
use crate::directory::UserDirectory;
use crate::phone::{Identity, normalize_phone};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Latest {
    summary: String,
    seconds: i64,
}

/// Per-counterparty latest message, updated one record at a time.
#[derive(Debug, Clone)]
pub struct ConversationIndex {
    me: Identity,
    slots: HashMap<Identity, usize>,
    entries: Vec<(Identity, Latest)>,
}

impl ConversationIndex {
    pub fn new(me: Identity) -> Self {
        Self { me, slots: HashMap::new(), entries: Vec::new() }
    }

    pub fn from_messages(me: Identity, messages: &[Message]) -> Self {
        let mut index = Self::new(me);
        for msg in messages {
            index.apply(msg);
        }
        index
    }

    /// Fold one message in. Returns false when the message does not involve `me`.
    pub fn apply(&mut self, msg: &Message) -> bool {
        let Some(counterparty) = counterparty(&self.me, msg) else { return false };
        let seconds = msg.seconds();
        match self.slots.get(&counterparty) {
            Some(&slot) => {
                let latest = &mut self.entries[slot].1;
                if seconds > latest.seconds {
                    latest.seconds = seconds;
                    latest.summary = msg.summary();
                }
            }
            None => {
                self.slots.insert(counterparty.clone(), self.entries.len());
                self.entries.push((counterparty, Latest { summary: msg.summary(), seconds }));
            }
        }
        true
    }

    pub fn snapshot(&self, directory: &UserDirectory) -> Vec<Conversation> {
        let mut out: Vec<Conversation> = self
            .entries
            .iter()
            .map(|(id, latest)| Conversation {
                counterparty: id.clone(),
                display_name: directory.display_name(id),
                avatar_url: directory.avatar_url(id),
                last_message_summary: latest.summary.clone(),
                last_timestamp: latest.seconds,
            })
            .collect();
        out.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        out
    }
}

/// The other participant of `msg` from `me`'s point of view, if `me` took part.
fn counterparty(me: &Identity, msg: &Message) -> Option<Identity> {
    let from = normalize_phone(&msg.from);
    let to = normalize_phone(&msg.chat_with);
    let other = if from == me.as_str() {
        to
    } else if to == me.as_str() {
        from
    } else {
        return None;
    };
    Identity::parse(&other)
}

/// Rebuild the conversation list from the full message set.
pub fn aggregate(me: &Identity, messages: &[Message], directory: &UserDirectory) -> Vec<Conversation> {
    ConversationIndex::from_messages(me.clone(), messages).snapshot(directory)
}

/// Case-insensitive substring match on the display name.
pub fn filter_by_name<'a>(conversations: &'a [Conversation], query: &str) -> Vec<&'a Conversation> {
    let needle = query.trim().to_lowercase();
    conversations
        .iter()
        .filter(|c| needle.is_empty() || c.display_name.to_lowercase().contains(&needle))
        .collect()
}

/// Messages exchanged between exactly `me` and `other`, newest first.
pub fn thread(me: &Identity, other: &Identity, messages: &[Message]) -> Vec<Message> {
    let mut out: Vec<Message> = messages
        .iter()
        .filter(|m| {
            let from = normalize_phone(&m.from);
            let to = normalize_phone(&m.chat_with);
            (from == me.as_str() && to == other.as_str()) || (from == other.as_str() && to == me.as_str())
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| b.seconds().cmp(&a.seconds()));
    out
}
