//! Inline `#tag` / `@mention` markup for render collaborators.
//!
//! # Invariants
//! - Tokens are `#` or `@` followed by one or more ASCII word characters.
//! - Concatenating every segment's source text reproduces the input.

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([#@])([A-Za-z0-9_]+)").expect("valid inline token regex"));

/// One piece of note content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// Tag name without the leading `#`.
    Tag(&'a str),
    /// Mention target without the leading `@`.
    Mention(&'a str),
}

impl Segment<'_> {
    /// Source text of this segment, sigil included.
    pub fn source(&self) -> String {
        match self {
            Self::Text(text) => (*text).to_string(),
            Self::Tag(name) => format!("#{name}"),
            Self::Mention(name) => format!("@{name}"),
        }
    }
}

/// Splits `content` into plain text, tag and mention segments.
pub fn tokenize(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for caps in INLINE_TOKEN_RE.captures_iter(content) {
        let (Some(whole), Some(sigil), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if whole.start() > cursor {
            segments.push(Segment::Text(&content[cursor..whole.start()]));
        }
        segments.push(match sigil.as_str() {
            "#" => Segment::Tag(name.as_str()),
            _ => Segment::Mention(name.as_str()),
        });
        cursor = whole.end();
    }
    if cursor < content.len() {
        segments.push(Segment::Text(&content[cursor..]));
    }
    segments
}

/// Tag names referenced inline, in order of appearance, without duplicates.
pub fn inline_tags(content: &str) -> Vec<String> {
    collect_unique(content, |segment| match segment {
        Segment::Tag(name) => Some(name),
        _ => None,
    })
}

/// Mention targets referenced inline, in order of appearance, without duplicates.
pub fn inline_mentions(content: &str) -> Vec<String> {
    collect_unique(content, |segment| match segment {
        Segment::Mention(name) => Some(name),
        _ => None,
    })
}

fn collect_unique<'a>(
    content: &'a str,
    pick: impl Fn(Segment<'a>) -> Option<&'a str>,
) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for name in tokenize(content).into_iter().filter_map(pick) {
        if !values.iter().any(|value| value == name) {
            values.push(name.to_string());
        }
    }
    values
}
