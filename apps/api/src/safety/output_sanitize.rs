//! Post-generation output sanitization.
//!
//! Removes leaked safety-preamble fragments and AI self-reference phrases from
//! the raw provider response. Runs before structured extraction, because leaked
//! fragments outside the JSON payload would otherwise confuse brace matching.

use tracing::debug;

use crate::safety::patterns::{LEAK_TERMINATORS, PREAMBLE_LEAK_MARKERS, SELF_REFERENCE_PATTERNS};

pub fn sanitize_output(raw: &str) -> String {
    let mut text = strip_preamble_leaks(raw);

    for rule in SELF_REFERENCE_PATTERNS.iter() {
        text = rule.regex.replace_all(&text, "").into_owned();
    }

    text.trim().to_string()
}

/// Removes every leaked preamble fragment, each running from its marker to the
/// next blank line, section delimiter or JSON structural character.
///
/// A fragment never ends inside a backslash escape: backslashes directly before
/// the terminator stay in the text, so `\"` inside a JSON string survives intact.
fn strip_preamble_leaks(raw: &str) -> String {
    let mut text = raw.to_string();
    let mut removed = 0usize;

    // Every pass removes at least the marker itself, so this terminates.
    while let Some(start) = earliest_leak(&text) {
        let marker_end = PREAMBLE_LEAK_MARKERS
            .iter()
            .filter_map(|rule| rule.regex.find_at(&text, start))
            .filter(|m| m.start() == start)
            .map(|m| m.end())
            .max()
            .unwrap_or(start + 1);

        let end = LEAK_TERMINATORS
            .iter()
            .filter_map(|t| text[marker_end..].find(t).map(|pos| marker_end + pos))
            .min()
            .unwrap_or(text.len());
        let end = text[..end].trim_end_matches('\\').len().max(marker_end);

        text.replace_range(start..end, "");
        removed += 1;
    }

    if removed > 0 {
        debug!(fragments = removed, "Stripped leaked preamble fragments from output");
    }
    text
}

fn earliest_leak(text: &str) -> Option<usize> {
    PREAMBLE_LEAK_MARKERS
        .iter()
        .filter_map(|rule| rule.regex.find(text).map(|m| m.start()))
        .min()
}
