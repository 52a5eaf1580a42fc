use std::ops::Range;

use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::Document;

/// Programmatic edits that compile to a single rope delta.
///
/// Keystroke edits arrive as whole new text from the UI and bypass this;
/// commands cover the edits the engine computes itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// First case-sensitive occurrence of `find`
    ReplaceFirst { find: String, replacement: String },
    /// Every non-overlapping occurrence, left to right, as one edit
    ReplaceAll { find: String, replacement: String },
}

/// Compile a command into a delta plus the selection after the edit.
///
/// Returns `None` when the command matches nothing: an empty search term or
/// one that does not occur.
pub(crate) fn compile_command(
    doc: &Document,
    cmd: &Cmd,
) -> Option<(Delta<RopeInfo>, Range<usize>)> {
    match cmd {
        Cmd::ReplaceFirst { find, replacement } => {
            if find.is_empty() {
                return None;
            }
            let content = doc.slice_to_cow(0..doc.len());
            let at = content.find(find.as_str())?;

            let mut builder = Builder::new(doc.len());
            builder.replace(at..at + find.len(), Rope::from(replacement.as_str()));
            Some((builder.build(), at..at + replacement.len()))
        }
        Cmd::ReplaceAll { find, replacement } => {
            if find.is_empty() {
                return None;
            }
            let content = doc.slice_to_cow(0..doc.len());
            let matches: Vec<usize> = content
                .match_indices(find.as_str())
                .map(|(at, _)| at)
                .collect();
            let last = *matches.last()?;

            // Builder replacements must be given in ascending order of the
            // original offsets
            let mut builder = Builder::new(doc.len());
            for &at in &matches {
                builder.replace(at..at + find.len(), Rope::from(replacement.as_str()));
            }

            // Selection spans the last replacement, in post-edit coordinates
            let preceding = matches.len() - 1;
            let start = last - preceding * find.len() + preceding * replacement.len();
            Some((builder.build(), start..start + replacement.len()))
        }
    }
}
