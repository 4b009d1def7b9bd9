//! In-process transcript storage, one ordered message history per
//! conversation id. Transcripts do not outlive the process.

use browserpilot_core::types::Message;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversation's transcript, creating an empty one on first
    /// reference. Returns a working copy; mutations are published with
    /// [`SessionStore::save`].
    pub fn get_or_create(&self, session_id: &str) -> Vec<Message> {
        let mut sessions = self.inner.write().expect("session store lock poisoned");
        sessions.entry(session_id.to_string()).or_default().clone()
    }

    /// The conversation's transcript, empty if it was never created.
    pub fn get(&self, session_id: &str) -> Vec<Message> {
        let sessions = self.inner.read().expect("session store lock poisoned");
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// Replace the stored transcript.
    pub fn save(&self, session_id: &str, transcript: Vec<Message>) {
        let mut sessions = self.inner.write().expect("session store lock poisoned");
        sessions.insert(session_id.to_string(), transcript);
    }

    /// Drop the conversation entirely.
    pub fn clear(&self, session_id: &str) {
        let mut sessions = self.inner.write().expect("session store lock poisoned");
        sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_starts_empty() {
        let store = SessionStore::new();
        assert!(store.get_or_create("a").is_empty());
    }

    #[test]
    fn test_save_then_get() {
        let store = SessionStore::new();
        store.save("a", vec![Message::user("hello")]);
        let transcript = store.get("a");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text(), "hello");
    }

    #[test]
    fn test_clear_then_get_is_empty() {
        let store = SessionStore::new();
        store.save("a", vec![Message::user("hello")]);
        store.clear("a");
        assert!(store.get("a").is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.save("a", vec![Message::user("for a")]);
        store.save("b", vec![Message::user("for b"), Message::user("again")]);
        assert_eq!(store.get("a").len(), 1);
        assert_eq!(store.get("b").len(), 2);
        store.clear("a");
        assert!(store.get("a").is_empty());
        assert_eq!(store.get("b").len(), 2);
    }
}
