//! Undo/redo stacks of document snapshots.
//!
//! Entries are whole [`Document`] values rather than inverse operations.
//! Documents share rope structure, so a snapshot costs little more than the
//! text that actually changed.

use crate::editing::Document;

/// Undo and redo stacks, most recent entry last.
///
/// Unbounded by default. With a capacity, the oldest undo entries are
/// dropped once the cap is reached.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    undo: Vec<Document>,
    redo: Vec<Document>,
    capacity: Option<usize>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `capacity` undo entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Record a committed state. Starting a new branch of history always
    /// invalidates the redo stack.
    pub fn record(&mut self, previous: Document) {
        self.push_undo(previous);
        self.redo.clear();
    }

    pub(crate) fn push_undo(&mut self, doc: Document) {
        self.undo.push(doc);
        if let Some(capacity) = self.capacity
            && self.undo.len() > capacity
        {
            let overflow = self.undo.len() - capacity;
            self.undo.drain(..overflow);
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Document> {
        self.undo.pop()
    }

    pub(crate) fn push_redo(&mut self, doc: Document) {
        self.redo.push(doc);
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Document> {
        self.redo.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_clears_redo() {
        let mut history = HistoryStore::new();
        history.push_redo(Document::from_text("redo me"));
        assert!(history.can_redo());

        history.record(Document::from_text("before"));

        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest_entries() {
        let mut history = HistoryStore::with_capacity(2);
        for text in ["one", "two", "three"] {
            history.record(Document::from_text(text));
        }

        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.pop_undo().unwrap().text(), "three");
        assert_eq!(history.pop_undo().unwrap().text(), "two");
        assert!(history.pop_undo().is_none());
    }

    #[test]
    fn test_stacks_are_lifo() {
        let mut history = HistoryStore::new();
        history.push_redo(Document::from_text("a"));
        history.push_redo(Document::from_text("b"));

        assert_eq!(history.pop_redo().unwrap().text(), "b");
        assert_eq!(history.pop_redo().unwrap().text(), "a");
    }
}
