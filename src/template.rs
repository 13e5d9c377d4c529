//! Numeric-range link templates
//!
//! A link may carry a single `[[START-END]]` annotation, e.g.
//! `http://host/show-[[001-117]].mkv`, which expands into one link per number
//! in the range, zero-padded to the literal width of `START`. Malformed
//! templates degrade to the literal link with a diagnostic; a link is never
//! dropped here.

use tracing::warn;

/// Opening marker of a numeric-range template
const OPEN: &str = "[[";
/// Closing marker of a numeric-range template
const CLOSE: &str = "]]";

/// Expand a numeric-range template inside a link
///
/// Looks for the first `[[` and the first `]]` after it. Without a complete
/// marker pair the link is returned unchanged as a single-element vector.
/// The text between the markers must be `START-END` with both sides all-digit,
/// the same literal width, `START` non-zero, and `START < END`; anything else
/// is reported and the link is returned unchanged.
///
/// A valid template produces one link per value in `[START, END]` inclusive,
/// in ascending order, each value formatted as a zero-padded decimal of
/// `START`'s width.
pub fn expand(link: &str) -> Vec<String> {
    let Some(open) = link.find(OPEN) else {
        return vec![link.to_string()];
    };
    let Some(close_rel) = link[open..].find(CLOSE) else {
        return vec![link.to_string()];
    };
    let close = open + close_rel;

    let inner = &link[open + OPEN.len()..close];
    let Some((start_text, end_text)) = parse_range(inner) else {
        warn!(template = %inner, link = %link, "bad number template in link");
        return vec![link.to_string()];
    };

    let width = start_text.len();
    // parse() cannot fail: parse_range only accepts all-digit parts
    let start: u64 = start_text.parse().unwrap_or(0);
    let end: u64 = end_text.parse().unwrap_or(0);

    let marker = format!("{OPEN}{inner}{CLOSE}");
    (start..=end)
        .map(|number| link.replace(&marker, &format!("{number:0width$}")))
        .collect()
}

/// Split and validate the template interior, returning (start, end) text
fn parse_range(inner: &str) -> Option<(&str, &str)> {
    let mut parts = inner.split('-');
    let start = parts.next()?;
    let end = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if start.is_empty() || end.is_empty() {
        return None;
    }
    if !start.bytes().all(|b| b.is_ascii_digit()) || !end.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let start_value: u64 = start.parse().ok()?;
    let end_value: u64 = end.parse().ok()?;
    if start_value == 0 || start_value >= end_value {
        return None;
    }
    Some((start, end))
}
