use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use xi_rope::Rope;

use crate::editing::Cmd;

/// Immutable editor document: text plus the current selection.
///
/// Every mutation produces a new `Document`. The text lives in an
/// `xi_rope::Rope`, so cloning a document is O(1) and the undo history can
/// hold many snapshots that share their unchanged structure.
///
/// ## Invariant
///
/// `0 <= selection.start <= selection.end <= len()`, and both ends sit on
/// UTF-8 char boundaries. Constructors clamp out-of-range selections instead
/// of failing, since selections usually come straight from a UI widget.
///
/// ```rust
/// # use kootopia_engine::editing::Document;
/// let doc = Document::new("fun main() {}", 4..8);
/// assert_eq!(doc.selected_text(), "main");
///
/// // Selections past the end are clamped
/// let doc = Document::new("abc", 1..99);
/// assert_eq!(doc.selection(), 1..3);
/// ```
#[derive(Clone)]
pub struct Document {
    pub(crate) buffer: Rope,
    pub(crate) selection: Range<usize>,
}

impl Document {
    /// Create a document with the given selection, clamped to the text.
    pub fn new(text: &str, selection: Range<usize>) -> Self {
        let selection = clamp_selection(text, selection);
        Self {
            buffer: Rope::from(text),
            selection,
        }
    }

    /// Create a document with the cursor at the end of the text
    pub fn from_text(text: &str) -> Self {
        let len = text.len();
        Self::new(text, len..len)
    }

    /// Get the current text content
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Length of the text in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Get the current selection range
    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Copy of this document with a different selection.
    pub fn with_selection(&self, selection: Range<usize>) -> Self {
        let text = self.text();
        Self {
            buffer: self.buffer.clone(),
            selection: clamp_selection(&text, selection),
        }
    }

    pub fn selected_text(&self) -> Cow<'_, str> {
        self.slice_to_cow(self.selection())
    }

    /// Slice the buffer to a cow string, clamping the range to the document
    pub fn slice_to_cow(&self, range: Range<usize>) -> Cow<'_, str> {
        let doc_len = self.buffer.len();
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);
        self.buffer.slice_to_cow(start..end)
    }

    /// Whether two documents hold the same text, ignoring selection.
    pub fn same_text(&self, other: &Document) -> bool {
        self.len() == other.len()
            && self.slice_to_cow(0..self.len()) == other.slice_to_cow(0..other.len())
    }

    /// Number of lines, counting the (possibly empty) line after the last `\n`.
    pub fn line_count(&self) -> usize {
        line_count(&self.slice_to_cow(0..self.len()))
    }

    /// Apply a command, producing the edited document with the selection
    /// over the (last) replacement. Returns `None` when the command does not
    /// apply, for example a find/replace that matches nothing.
    pub fn apply(&self, cmd: &Cmd) -> Option<Document> {
        let (delta, selection) = crate::editing::commands::compile_command(self, cmd)?;
        Some(Document {
            buffer: delta.apply(&self.buffer),
            selection,
        })
    }

    /// Number of characters (Unicode scalar values)
    pub fn char_count(&self) -> usize {
        self.slice_to_cow(0..self.len()).chars().count()
    }

    /// Number of whitespace-separated words
    pub fn word_count(&self) -> usize {
        self.slice_to_cow(0..self.len()).split_whitespace().count()
    }

    /// 1-based (row, column) of the selection start, as a status bar shows it.
    /// Columns count characters, not bytes.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = self.slice_to_cow(0..self.selection.start);
        let row = before.matches('\n').count() + 1;
        let last_line = before.rsplit('\n').next().unwrap_or("");
        (row, last_line.chars().count() + 1)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("text", &self.text())
            .field("selection", &self.selection)
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.selection == other.selection && self.same_text(other)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::from_text("")
    }
}

/// Line count of raw text; an empty string is one empty line.
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

fn clamp_selection(text: &str, selection: Range<usize>) -> Range<usize> {
    let start = floor_char_boundary(text, selection.start);
    let end = floor_char_boundary(text, selection.end.max(selection.start));
    start..end.max(start)
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
