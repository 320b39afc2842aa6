// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic transcript cleanup.
//!
//! `scrub` is a fixed point: running it twice yields the same text. The
//! user replacement map is applied afterwards and is deliberately not
//! part of that guarantee (a replacement may produce anything).

/// Phrases the upstream models hallucinate on silence or music.
const HALLUCINATED_PHRASES: &[&str] = &[
    "Thanks for watching.",
    "Thank you for watching.",
    "Subtitles by",
    "Please subscribe",
];

/// Normalize whitespace and strip known hallucinated phrases.
pub fn scrub(text: &str) -> String {
    let mut out = text.replace(['\n', '\r'], " ");
    out = collapse_spaces(&out);
    out = strip_phrases(&out);
    out = collapse_spaces(&out);
    out.trim().to_string()
}

/// Apply user-supplied substring replacements, in map order.
pub fn apply_replacements<'a, I>(text: &str, replacements: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = text.to_string();
    for (from, to) in replacements {
        if !from.is_empty() {
            out = out.replace(from, to);
        }
    }
    out
}

/// Collapse runs of spaces to one, to a fixed point.
fn collapse_spaces(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out
}

/// Remove every phrase occurrence, re-running until stable: removals can
/// splice new occurrences together.
fn strip_phrases(text: &str) -> String {
    let mut out = text.to_string();
    loop {
        let mut next = out.clone();
        for phrase in HALLUCINATED_PHRASES {
            next = next.replace(phrase, "");
        }
        if next == out {
            return out;
        }
        out = next;
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
