//! `@alias` token scanning
//!
//! The token grammar is shared by plain-text resolution and content
//! assembly, so both agree on which substrings are references.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern of an alias reference: `@` followed by ASCII word characters or `-`
pub const ALIAS_TOKEN_PATTERN: &str = r"@([A-Za-z0-9_-]+)";

pub(crate) static ALIAS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(ALIAS_TOKEN_PATTERN).expect("alias token pattern is valid"));

/// One `@alias` reference found in a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasToken<'a> {
    /// Referenced alias, without the `@`
    pub alias: &'a str,
    /// Byte offset of the `@`
    pub start: usize,
    /// Byte offset one past the last alias character
    pub end: usize,
}

/// A run of literal text or a reference, in source order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text between references, never empty
    Literal(&'a str),
    /// An alias reference
    Token(AliasToken<'a>),
}

/// Iterate over the alias references in `text`
pub fn tokens(text: &str) -> impl Iterator<Item = AliasToken<'_>> {
    ALIAS_TOKEN.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let alias = caps.get(1)?;
        Some(AliasToken {
            alias: alias.as_str(),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// Split `text` into literal runs and references
#[must_use]
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for token in tokens(text) {
        if token.start > cursor {
            out.push(Segment::Literal(&text[cursor..token.start]));
        }
        out.push(Segment::Token(token));
        cursor = token.end;
    }
    if cursor < text.len() {
        out.push(Segment::Literal(&text[cursor..]));
    }
    out
}

/// Check if `text` contains at least one reference
#[inline]
#[must_use]
pub fn has_tokens(text: &str) -> bool {
    ALIAS_TOKEN.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tokens_stop_at_punctuation() {
        let found: Vec<_> = tokens("see @con-1, then @output_2.").map(|t| t.alias).collect();
        assert_eq!(found, vec!["con-1", "output_2"]);
    }

    #[test]
    fn lone_at_sign_is_literal() {
        assert!(!has_tokens("mail me @ home"));
        assert_eq!(segments("a @ b"), vec![Segment::Literal("a @ b")]);
    }

    #[test]
    fn segments_cover_input_in_order() {
        let text = "combine @con-1 and @con-2";
        let segs = segments(text);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[0], Segment::Literal("combine "));
        assert!(matches!(segs[1], Segment::Token(t) if t.alias == "con-1"));
        assert_eq!(segs[2], Segment::Literal(" and "));
        assert!(matches!(segs[3], Segment::Token(t) if t.alias == "con-2" && t.end == text.len()));
    }

    #[test]
    fn non_ascii_word_characters_end_a_token() {
        let found: Vec<_> = tokens("@café").map(|t| t.alias).collect();
        assert_eq!(found, vec!["caf"]);
    }
}
