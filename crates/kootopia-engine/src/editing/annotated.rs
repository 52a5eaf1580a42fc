use std::collections::BTreeSet;

/// One source line with its highlight marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    /// Zero-based line index
    pub index: usize,
    pub text: String,
    /// Set when a diagnostic points at this line
    pub flagged: bool,
}

/// Source text split into lines, each carrying an error-highlight marker.
///
/// This is what the UI layer renders; it never computes the markers itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotatedText {
    pub lines: Vec<AnnotatedLine>,
}

impl AnnotatedText {
    pub fn new(text: &str, flagged: &BTreeSet<usize>) -> Self {
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(index, line)| AnnotatedLine {
                index,
                text: line.to_string(),
                flagged: flagged.contains(&index),
            })
            .collect();
        Self { lines }
    }

    pub fn flagged_lines(&self) -> impl Iterator<Item = &AnnotatedLine> {
        self.lines.iter().filter(|line| line.flagged)
    }

    /// Reassemble the plain text, markers dropped
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
