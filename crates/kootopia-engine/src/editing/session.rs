use std::collections::BTreeSet;
use std::ops::Range;

use crate::editing::{AnnotatedText, Cmd, Document, HistoryStore};

/// Editor state for one open file: live document, undo/redo history, the
/// saved-content checkpoint and error-line highlights.
///
/// ## Checkpoints
///
/// - `current` follows every keystroke, so the UI is always live.
/// - `last_committed` is the most recent undo boundary. Edits between two
///   commits coalesce into a single history entry.
/// - `saved` is the text last written to storage. Dirty tracking compares
///   against this, never against `last_committed`.
///
/// ## Threading
///
/// No internal locking. All calls must come from the single context that
/// owns the session (the UI event loop); compile results are marshalled back
/// onto that context before they touch the session.
///
/// ```rust
/// # use kootopia_engine::editing::EditSession;
/// let mut session = EditSession::new("");
/// session.edit("p", 1..1);
/// session.edit("pr", 2..2);
/// session.edit("print", 5..5);
/// session.commit();
///
/// // Three keystrokes, one undo step
/// assert!(session.undo());
/// assert_eq!(session.current().text(), "");
/// ```
#[derive(Debug, Clone)]
pub struct EditSession {
    current: Document,
    last_committed: Document,
    history: HistoryStore,
    pending: bool,
    saved: Document,
    highlights: BTreeSet<usize>,
}

impl EditSession {
    /// Start a session for freshly loaded text. The text counts as saved.
    pub fn new(text: &str) -> Self {
        Self::with_history(text, HistoryStore::new())
    }

    pub fn with_history(text: &str, history: HistoryStore) -> Self {
        let doc = Document::new(text, 0..0);
        Self {
            current: doc.clone(),
            last_committed: doc.clone(),
            history,
            pending: false,
            saved: doc,
            highlights: BTreeSet::new(),
        }
    }

    /// Throw away all state and start over with new text, as when another
    /// file is opened.
    pub fn reset(&mut self, text: &str) {
        let mut history = std::mem::take(&mut self.history);
        history.clear();
        *self = Self::with_history(text, history);
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Whether edits have happened since the last commit
    pub fn has_pending_edits(&self) -> bool {
        self.pending
    }

    /// Replace the live document. Does not touch history.
    pub fn edit(&mut self, text: &str, selection: Range<usize>) {
        let doc = Document::new(text, selection);
        self.replace_current(doc);
    }

    /// Create an undo boundary if anything changed since the last one.
    pub fn commit(&mut self) {
        if self.pending {
            self.push_boundary();
        }
    }

    /// Create an undo boundary regardless of the pending flag.
    ///
    /// Used after programmatic replacements (open, new, rename, save) so the
    /// next keystroke never coalesces with them. When the text has not moved
    /// since the last boundary no entry is pushed, which keeps repeated saves
    /// from filling the history with no-op steps.
    pub fn force_commit(&mut self) {
        if self.current.same_text(&self.last_committed) {
            self.last_committed = self.current.clone();
            self.pending = false;
            return;
        }
        self.push_boundary();
    }

    fn push_boundary(&mut self) {
        let previous = std::mem::replace(&mut self.last_committed, self.current.clone());
        self.history.record(previous);
        self.pending = false;
    }

    /// Step back one undo boundary. Pending edits are committed first, so
    /// the uncommitted burst is itself the step being undone.
    pub fn undo(&mut self) -> bool {
        self.commit();
        let Some(previous) = self.history.pop_undo() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, previous.clone());
        self.history.push_redo(current);
        self.last_committed = previous;
        self.highlights.clear();
        log::debug!("undo: {} step(s) left", self.history.undo_len());
        true
    }

    /// Re-apply the most recently undone step. Pending edits are committed
    /// first, which invalidates the redo stack.
    pub fn redo(&mut self) -> bool {
        self.commit();
        let Some(next) = self.history.pop_redo() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, next.clone());
        self.history.push_undo(current);
        self.last_committed = next;
        self.highlights.clear();
        log::debug!("redo: {} step(s) left", self.history.redo_len());
        true
    }

    /// Replace the first case-sensitive occurrence of `find`.
    ///
    /// Returns `false`, leaving the document untouched, when `find` is empty
    /// or does not occur.
    pub fn replace(&mut self, find: &str, replacement: &str) -> bool {
        self.apply(Cmd::ReplaceFirst {
            find: find.to_string(),
            replacement: replacement.to_string(),
        })
    }

    /// Replace every non-overlapping occurrence of `find` in one edit.
    pub fn replace_all(&mut self, find: &str, replacement: &str) -> bool {
        self.apply(Cmd::ReplaceAll {
            find: find.to_string(),
            replacement: replacement.to_string(),
        })
    }

    /// Apply a command as a single edit. Returns whether it applied.
    pub fn apply(&mut self, cmd: Cmd) -> bool {
        match self.current.apply(&cmd) {
            Some(doc) => {
                self.replace_current(doc);
                true
            }
            None => {
                log::debug!("command did not apply: {cmd:?}");
                false
            }
        }
    }

    /// Selection-only change; keeps the pending flag and highlights as they are.
    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.current = self.current.with_selection(selection);
    }

    fn replace_current(&mut self, doc: Document) {
        if !doc.same_text(&self.current) {
            self.highlights.clear();
        }
        self.current = doc;
        self.pending = true;
    }

    /// Whether the live text differs from what was last saved
    pub fn has_unsaved_changes(&self) -> bool {
        !self.current.same_text(&self.saved)
    }

    /// Record that the live text has just been written to storage
    pub fn mark_saved(&mut self) {
        self.saved = self.current.clone();
    }

    /// Replace the error highlights with `lines`, dropping indices that fall
    /// outside the current text.
    pub fn apply_diagnostics(&mut self, lines: &BTreeSet<usize>) {
        let line_count = self.current.line_count();
        self.highlights = lines.iter().copied().filter(|&l| l < line_count).collect();
    }

    pub fn clear_highlights(&mut self) {
        self.highlights.clear();
    }

    pub fn highlighted_lines(&self) -> &BTreeSet<usize> {
        &self.highlights
    }

    /// Current text with error-line markers, ready for rendering
    pub fn annotated(&self) -> AnnotatedText {
        AnnotatedText::new(&self.current.text(), &self.highlights)
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new("")
    }
}
