//! Append-only record of completed exchanges.

use ems_protocol::ConversationEntry;

/// Conversation log for one session. Entries are never mutated after push.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return a reference to it.
    pub fn push(&mut self, entry: ConversationEntry) -> &ConversationEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Oldest first.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    /// Display order: most recent exchange first.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
