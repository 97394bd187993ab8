//! Markup sanitizer for free-text fields.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]
//!
//! Pattern-based filtering, not an HTML parser: strips embedded active
//! content from descriptions and notes before they are persisted.

use regex::Regex;
use std::sync::LazyLock;

/// Paired dangerous elements, content included.
static PAIRED_TAG_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "iframe", "object", "embed"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("static regex: paired tag pattern")
        })
        .collect()
});

/// Unpaired or self-closing dangerous tags, and stray closing tags.
static LONE_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?\s*(?:script|style|iframe|object|embed)\b[^>]*>")
        .expect("static regex: lone tag pattern")
});

static EVENT_HANDLER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("static regex: event handler pattern")
});

static URI_SCHEME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:javascript|vbscript|data)\s*:").expect("static regex: URI scheme pattern")
});

/// Strips dangerous markup from `text`.
///
/// Returns `None` for `None` input. Never fails.
#[must_use]
pub fn sanitize(text: Option<&str>) -> Option<String> {
    let text = text?;

    let mut cleaned = text.to_string();
    for regex in PAIRED_TAG_REGEXES.iter() {
        cleaned = regex.replace_all(&cleaned, "").into_owned();
    }
    cleaned = LONE_TAG_REGEX.replace_all(&cleaned, "").into_owned();
    cleaned = EVENT_HANDLER_REGEX.replace_all(&cleaned, "").into_owned();
    cleaned = URI_SCHEME_REGEX.replace_all(&cleaned, "").into_owned();

    Some(cleaned)
}
