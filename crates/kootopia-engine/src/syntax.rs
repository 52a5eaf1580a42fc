//! Keyword, comment and string spans for the editor's syntax colouring.

use regex::Regex;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Comment,
    Str,
}

/// A styled byte range of the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub range: Range<usize>,
    pub kind: TokenKind,
}

/// Language tokens to colour
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenRules<'a> {
    pub keywords: &'a [String],
    /// Line comment openers, e.g. `//` or `#`
    pub comments: &'a [String],
    /// String delimiters; quotes of both kinds when empty
    pub strings: &'a [String],
}

/// Spans for every keyword, line comment and string literal in `text`.
///
/// Spans are returned keywords first, then comments, then strings. Where
/// they overlap, later spans take precedence when rendered.
pub fn highlight_syntax(text: &str, rules: TokenRules<'_>) -> Vec<StyledSpan> {
    let mut spans = Vec::new();

    for keyword in rules.keywords.iter().filter(|k| !k.is_empty()) {
        let pattern = format!(r"\b{}\b", regex::escape(keyword));
        push_matches(&mut spans, text, &pattern, TokenKind::Keyword);
    }

    for comment in rules.comments.iter().filter(|c| !c.is_empty()) {
        let pattern = format!("{}.*", regex::escape(comment));
        push_matches(&mut spans, text, &pattern, TokenKind::Comment);
    }

    let string_pattern = if rules.strings.iter().all(|s| s.is_empty()) {
        r#"".*?"|'.*?'"#.to_string()
    } else {
        rules
            .strings
            .iter()
            .filter(|s| !s.is_empty())
            .map(|delim| {
                let delim = regex::escape(delim);
                format!("{delim}.*?{delim}")
            })
            .collect::<Vec<_>>()
            .join("|")
    };
    push_matches(&mut spans, text, &string_pattern, TokenKind::Str);

    spans
}

fn push_matches(spans: &mut Vec<StyledSpan>, text: &str, pattern: &str, kind: TokenKind) {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            log::warn!("skipping {kind:?} pattern {pattern:?}: {e}");
            return;
        }
    };
    spans.extend(regex.find_iter(text).map(|m| StyledSpan {
        range: m.range(),
        kind,
    }));
}
