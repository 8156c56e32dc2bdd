//! Conversation store keyed by session

use super::message::{Message, SessionKey};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage seam for conversation history.
///
/// Implementations must be safe to share between tasks. Appends to one key
/// are linearised; `snapshot` returns an owned copy that later appends can
/// never reach.
pub trait SessionStore: Send + Sync {
    /// Append a message, creating the session when absent
    fn append(&self, key: &SessionKey, message: Message);

    /// Copy of the session's messages (empty when absent)
    fn snapshot(&self, key: &SessionKey) -> Vec<Message>;

    /// Drop the session entirely. Resetting an unknown key is a no-op.
    fn reset(&self, key: &SessionKey);

    /// Number of messages in the session
    fn len(&self, key: &SessionKey) -> usize {
        self.snapshot(key).len()
    }

    /// Number of live sessions
    fn session_count(&self) -> usize;
}

/// In-memory history for every chat the bot talks to.
///
/// A single reader/writer lock guards the whole map: snapshots run in
/// parallel, appends and resets are exclusive. Lock hold time is bounded by
/// the length of one session.
#[derive(Debug, Default)]
pub struct ConversationStore {
    sessions: RwLock<HashMap<SessionKey, Vec<Message>>>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for ConversationStore {
    fn append(&self, key: &SessionKey, message: Message) {
        let mut sessions = self.sessions.write();
        sessions.entry(key.clone()).or_default().push(message);
    }

    fn snapshot(&self, key: &SessionKey) -> Vec<Message> {
        self.sessions.read().get(key).cloned().unwrap_or_default()
    }

    fn reset(&self, key: &SessionKey) {
        if self.sessions.write().remove(key).is_some() {
            tracing::debug!("Cleared conversation history for session {}", key);
        }
    }

    fn len(&self, key: &SessionKey) -> usize {
        self.sessions.read().get(key).map_or(0, Vec::len)
    }

    fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn test_snapshot_of_unknown_session_is_empty() {
        let store = ConversationStore::new();
        assert!(store.snapshot(&SessionKey::from(7i64)).is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_append_keeps_order() {
        let store = ConversationStore::new();
        let key = SessionKey::from(42i64);
        store.append(&key, Message::user("hi"));
        store.append(&key, Message::assistant("hello"));

        let history = store.snapshot(&key);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[1].role(), Role::Assistant);
        assert_eq!(history[1].content(), "hello");
    }

    #[test]
    fn test_snapshot_is_detached_from_later_appends() {
        let store = ConversationStore::new();
        let key = SessionKey::from("detached");
        store.append(&key, Message::user("one"));

        let before = store.snapshot(&key);
        store.append(&key, Message::user("two"));

        assert_eq!(before, vec![Message::user("one")]);
        assert_eq!(store.len(&key), 2);
    }

    #[test]
    fn test_reset_then_snapshot_is_empty() {
        let store = ConversationStore::new();
        let key = SessionKey::from(1i64);
        store.append(&key, Message::user("a"));
        store.append(&key, Message::assistant("b"));

        store.reset(&key);
        assert!(store.snapshot(&key).is_empty());
        assert_eq!(store.session_count(), 0);

        store.append(&key, Message::user("again"));
        assert_eq!(store.snapshot(&key), vec![Message::user("again")]);
    }

    #[test]
    fn test_reset_unknown_session_leaves_others() {
        let store = ConversationStore::new();
        let kept = SessionKey::from(1i64);
        store.append(&kept, Message::user("keep me"));

        store.reset(&SessionKey::from(2i64));
        store.reset(&SessionKey::from(2i64));

        assert_eq!(store.snapshot(&kept), vec![Message::user("keep me")]);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = ConversationStore::new();
        let a = SessionKey::from("a");
        let b = SessionKey::from("b");
        store.append(&b, Message::user("b1"));
        let b_before = store.snapshot(&b);

        store.append(&a, Message::user("a1"));
        store.append(&a, Message::assistant("a2"));

        assert_eq!(store.snapshot(&b), b_before);
        assert_eq!(store.len(&a), 2);
    }
}
