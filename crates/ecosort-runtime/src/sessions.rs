//! In-memory conversations keyed by session id.

use parking_lot::RwLock;
use std::collections::HashMap;

use ecosort_core::{Conversation, Message};

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Conversation>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to a session, creating it on first use.
    pub fn append(&self, session_id: &str, message: Message) {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .append(message);
    }

    /// Snapshot of a session; empty for unknown ids.
    pub fn get(&self, session_id: &str) -> Conversation {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
