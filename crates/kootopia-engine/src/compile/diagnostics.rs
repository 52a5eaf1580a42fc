//! Map compiler and interpreter output to the source lines it blames.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::editing::document::line_count;

/// 0-based line indices to flag in the editor
pub type DiagnosticSet = BTreeSet<usize>;

fn error_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // kotlinc: "error: ... line 5"
            r"(?i)error:.* line (\d+)",
            // javac and kotlinc with columns: "Main.java:15:10: error:"
            r"(?i)(\d+):\d+: error:",
            // generic: "line 8:"
            r"(?i)line (\d+):",
            // CPython tracebacks: File "x.py", line 3
            r#"(?i)File ".*?", line (\d+)"#,
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Invalid error line regex"))
        .collect()
    })
}

/// Every 1-based line number any known error format mentions, converted to
/// 0-based. Zero and unparseable numbers are skipped.
pub fn error_lines(raw_output: &str) -> DiagnosticSet {
    let mut lines = DiagnosticSet::new();
    for pattern in error_patterns() {
        for caps in pattern.captures_iter(raw_output) {
            let Some(number) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
                continue;
            };
            if number > 0 {
                lines.insert(number - 1);
            }
        }
    }
    lines
}

/// Error lines from `raw_output` that exist in `source_code`.
///
/// Never fails: output in an unknown format simply yields an empty set.
pub fn map_diagnostics(raw_output: &str, source_code: &str) -> DiagnosticSet {
    let available = line_count(source_code);
    let mut lines = error_lines(raw_output);
    lines.retain(|&line| line < available);
    if !lines.is_empty() {
        log::debug!("flagging lines {lines:?}");
    }
    lines
}
