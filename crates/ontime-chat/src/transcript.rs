//! Chat transcript: in-memory history, its persisted snapshot, and the view.

use std::sync::{Arc, Mutex};

use ontime_core::types::ChatMessage;
use ontime_storage::HistoryStore;
use tracing::{info, warn};

use crate::view::ChatView;

#[derive(Default)]
struct History {
    messages: Vec<ChatMessage>,
    /// The persisted snapshot has been merged into `messages`.
    synced: bool,
}

impl History {
    /// Put the persisted entries in front of anything appended so far.
    fn merge(&mut self, loaded: Vec<ChatMessage>) {
        let newer = std::mem::replace(&mut self.messages, loaded);
        self.messages.extend(newer);
        self.synced = true;
    }
}

/// Append-only transcript shared by the chat controller and the document
/// workflow.
///
/// Every append persists the full history. Persistence failures are logged
/// and the in-memory history stays authoritative. Nothing is saved until the
/// stored snapshot has been loaded, so a failed load never overwrites it.
pub struct Transcript {
    history: Mutex<History>,
    store: Arc<dyn HistoryStore>,
    view: Arc<dyn ChatView>,
}

impl Transcript {
    pub fn new(store: Arc<dyn HistoryStore>, view: Arc<dyn ChatView>) -> Self {
        Self {
            history: Mutex::new(History::default()),
            store,
            view,
        }
    }

    pub fn view(&self) -> &Arc<dyn ChatView> {
        &self.view
    }

    /// Load the persisted history and render it.
    ///
    /// Entries appended before the restore are kept after the loaded ones.
    /// Returns the number of restored messages.
    pub fn restore(&self) -> usize {
        self.load(true)
    }

    /// Load the persisted history without rendering it.
    pub fn resume(&self) -> usize {
        self.load(false)
    }

    fn load(&self, render: bool) -> usize {
        let mut history = match self.history.lock() {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "Transcript lock poisoned; history not loaded");
                return 0;
            }
        };

        let restored = if history.synced {
            history.messages.clone()
        } else {
            match self.store.load_history() {
                Ok(loaded) => {
                    history.merge(loaded.clone());
                    loaded
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load chat history; saving paused until it loads");
                    return 0;
                }
            }
        };
        drop(history);

        if render {
            for message in &restored {
                self.view.show_message(message);
            }
        }
        info!(count = restored.len(), "Chat history restored");
        restored.len()
    }

    /// Append a message, persist the history, and render the message.
    pub fn append(&self, message: ChatMessage) {
        self.view.show_message(&message);
        self.record(message);
    }

    /// Append a message and persist the history without rendering it.
    ///
    /// If the stored history has not been loaded yet, it is loaded first. If
    /// that fails the message is kept in memory only.
    pub fn record(&self, message: ChatMessage) {
        let mut history = match self.history.lock() {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "Transcript lock poisoned; message not recorded");
                return;
            }
        };
        history.messages.push(message);

        if !history.synced {
            match self.store.load_history() {
                Ok(loaded) => history.merge(loaded),
                Err(e) => {
                    warn!(
                        error = %e,
                        count = history.messages.len(),
                        "Stored chat history not loaded; skipping save"
                    );
                    return;
                }
            }
        }

        // Saved under the lock so snapshots reach the store in append order.
        if let Err(e) = self.store.save_history(&history.messages) {
            warn!(error = %e, count = history.messages.len(), "Failed to save chat history");
        }
    }

    /// Copy of the current history.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.history
            .lock()
            .map(|h| h.messages.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.history.lock().map(|h| h.messages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{RecordingView, ViewEvent};
    use ontime_storage::{MemoryHistoryStore, StorageError};

    struct FailingStore;

    impl HistoryStore for FailingStore {
        fn load_history(&self) -> Result<Vec<ChatMessage>, StorageError> {
            Err(StorageError::Database("unavailable".into()))
        }

        fn save_history(&self, _messages: &[ChatMessage]) -> Result<(), StorageError> {
            Err(StorageError::Database("unavailable".into()))
        }
    }

    /// Wraps a memory store and fails the first `failures` loads.
    struct LockedStore {
        inner: MemoryHistoryStore,
        failures: Mutex<u32>,
    }

    impl LockedStore {
        fn new(seeded: &[ChatMessage], failures: u32) -> Self {
            Self {
                inner: MemoryHistoryStore::with_history(seeded).unwrap(),
                failures: Mutex::new(failures),
            }
        }
    }

    impl HistoryStore for LockedStore {
        fn load_history(&self) -> Result<Vec<ChatMessage>, StorageError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(StorageError::Database("database is locked".into()));
            }
            self.inner.load_history()
        }

        fn save_history(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
            self.inner.save_history(messages)
        }
    }

    fn seeded_history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("q1"),
            ChatMessage::ai("a1"),
            ChatMessage::user("q2"),
        ]
    }

    fn texts(messages: &[ChatMessage]) -> Vec<String> {
        messages.iter().map(|m| m.text.clone()).collect()
    }

    fn transcript_with(store: Arc<dyn HistoryStore>) -> (Transcript, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::new());
        (Transcript::new(store, view.clone()), view)
    }

    #[test]
    fn test_append_renders_and_persists() {
        let store = Arc::new(MemoryHistoryStore::new());
        let (transcript, view) = transcript_with(store.clone());

        transcript.append(ChatMessage::user("hi"));
        transcript.append(ChatMessage::ai("hello"));

        assert_eq!(transcript.len(), 2);
        assert_eq!(view.message_texts(), vec!["hi", "hello"]);
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load_history().unwrap(), transcript.messages());
    }

    #[test]
    fn test_record_persists_without_rendering() {
        let store = Arc::new(MemoryHistoryStore::new());
        let (transcript, view) = transcript_with(store.clone());

        transcript.record(ChatMessage::ai("{\"a\": 1}"));
        assert!(view.events().is_empty());
        assert_eq!(store.load_history().unwrap().len(), 1);
    }

    #[test]
    fn test_every_snapshot_extends_the_previous() {
        let store = Arc::new(MemoryHistoryStore::new());
        let (transcript, _view) = transcript_with(store.clone());

        let mut previous = Vec::new();
        for i in 0..5 {
            transcript.append(ChatMessage::user(format!("q{}", i)));
            let snapshot = store.load_history().unwrap();
            assert_eq!(snapshot.len(), previous.len() + 1);
            assert_eq!(&snapshot[..previous.len()], &previous[..]);
            previous = snapshot;
        }
    }

    #[test]
    fn test_restore_renders_history() {
        let seeded = vec![ChatMessage::user("old question"), ChatMessage::ai("old answer")];
        let store = Arc::new(MemoryHistoryStore::with_history(&seeded).unwrap());
        let (transcript, view) = transcript_with(store);

        assert_eq!(transcript.restore(), 2);
        assert_eq!(transcript.messages(), seeded);
        assert_eq!(view.message_texts(), vec!["old question", "old answer"]);
    }

    #[test]
    fn test_restore_keeps_earlier_appends() {
        let seeded = vec![ChatMessage::user("persisted")];
        let store = Arc::new(MemoryHistoryStore::with_history(&seeded).unwrap());
        let (transcript, _view) = transcript_with(store);

        transcript.append(ChatMessage::user("live"));
        transcript.restore();

        let texts: Vec<String> = transcript.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["persisted", "live"]);
    }

    #[test]
    fn test_resume_loads_without_rendering() {
        let seeded = vec![ChatMessage::user("earlier")];
        let store = Arc::new(MemoryHistoryStore::with_history(&seeded).unwrap());
        let (transcript, view) = transcript_with(store.clone());

        assert_eq!(transcript.resume(), 1);
        assert!(view.events().is_empty());
        transcript.append(ChatMessage::user("now"));
        assert_eq!(store.load_history().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_restore_does_not_overwrite_stored_history() {
        let store = Arc::new(LockedStore::new(&seeded_history(), 1));
        let (transcript, _view) = transcript_with(store.clone());

        assert_eq!(transcript.restore(), 0);
        transcript.append(ChatMessage::user("new"));

        // The append retried the load and kept every earlier entry.
        assert_eq!(
            texts(&store.inner.load_history().unwrap()),
            vec!["q1", "a1", "q2", "new"]
        );
        assert_eq!(texts(&transcript.messages()), vec!["q1", "a1", "q2", "new"]);
    }

    #[test]
    fn test_no_save_while_history_cannot_load() {
        let store = Arc::new(LockedStore::new(&seeded_history(), 3));
        let (transcript, view) = transcript_with(store.clone());

        assert_eq!(transcript.resume(), 0);
        transcript.append(ChatMessage::user("first"));
        transcript.append(ChatMessage::user("second"));

        assert_eq!(store.inner.save_count(), 0);
        assert_eq!(texts(&store.inner.load_history().unwrap()), vec!["q1", "a1", "q2"]);
        assert_eq!(view.message_texts(), vec!["first", "second"]);

        // Once the store answers, the stored entries go first.
        transcript.append(ChatMessage::user("third"));
        assert_eq!(
            texts(&store.inner.load_history().unwrap()),
            vec!["q1", "a1", "q2", "first", "second", "third"]
        );
    }

    #[test]
    fn test_append_without_restore_keeps_stored_history() {
        let store = Arc::new(MemoryHistoryStore::with_history(&seeded_history()).unwrap());
        let (transcript, _view) = transcript_with(store.clone());

        transcript.append(ChatMessage::ai("a2"));
        assert_eq!(
            texts(&store.load_history().unwrap()),
            vec!["q1", "a1", "q2", "a2"]
        );
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let (transcript, view) = transcript_with(Arc::new(FailingStore));

        assert_eq!(transcript.restore(), 0);
        transcript.append(ChatMessage::user("still works"));
        assert_eq!(transcript.len(), 1);
        assert!(matches!(view.events()[0], ViewEvent::Message(_)));
    }
}
