//! Conversation history storage.
//!
//! [`HistoryStore`] is the seam between the client layer and whatever
//! persistence the application uses. The crate ships
//! [`InMemoryHistory`]; applications with durable storage implement the
//! trait over their own backend.

use std::sync::{Arc, Mutex};

use crate::message::Message;

/// A transcript store appended to by the stream pipeline and read by
/// the orchestration loop.
///
/// Implementations must be cheap to call from a stream processor; do
/// blocking I/O on a queue, not inline.
pub trait HistoryStore: Send + Sync {
    /// Appends one message to the transcript.
    fn append(&self, message: Message);

    /// Returns the most recent `n` messages, oldest first.
    fn recent(&self, n: usize) -> Vec<Message>;

    /// Returns the full transcript, oldest first.
    fn all(&self) -> Vec<Message>;
}

/// A process-local [`HistoryStore`] backed by a mutex-guarded vector.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryHistory {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store behind an `Arc`, ready for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&self, message: Message) {
        self.lock().push(message);
    }

    fn recent(&self, n: usize) -> Vec<Message> {
        let messages = self.lock();
        let start = messages.len().saturating_sub(n);
        messages[start..].to_vec()
    }

    fn all(&self) -> Vec<Message> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_all() {
        let store = InMemoryHistory::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "one");
        assert_eq!(all[1].content, "two");
    }

    #[test]
    fn test_recent_returns_tail_oldest_first() {
        let store = InMemoryHistory::new();
        for i in 0..5 {
            store.append(Message::user(format!("m{i}")));
        }
        let recent = store.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "m3");
        assert_eq!(recent[1].content, "m4");
    }

    #[test]
    fn test_recent_larger_than_len() {
        let store = InMemoryHistory::new();
        store.append(Message::user("only"));
        assert_eq!(store.recent(10).len(), 1);
    }

    #[test]
    fn test_shared_store_across_threads() {
        let store = InMemoryHistory::shared();
        let writer = Arc::clone(&store);
        std::thread::spawn(move || {
            writer.append(Message::user("from thread"));
        })
        .join()
        .unwrap();
        assert_eq!(store.all().len(), 1);
    }
}
