//! Input Sanitizer: classifies and cleans free text before it enters a prompt.
//!
//! Three tiers, applied in order:
//! 1. Block: injection or fabrication-request phrasing rejects the whole input.
//! 2. Strip: script tags, inline event handlers and `javascript:` URIs are
//!    replaced by placeholders, one warning per replacement.
//! 3. Escape: prompt-structural delimiters are rewritten to inert look-alikes.
//!
//! The output of a non-blocked pass is a fixed point: sanitizing it again
//! changes nothing.

use tracing::{debug, warn};

use crate::safety::patterns::{BLOCK_PATTERNS, ESCAPE_RULES, STRIP_PATTERNS};
use crate::safety::types::{BlockCategory, SanitizationResult};

pub const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Clone, Copy)]
pub struct InputSanitizer {
    max_chars: usize,
}

impl Default for InputSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS)
    }
}

impl InputSanitizer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn sanitize(&self, raw: &str) -> SanitizationResult {
        if let Some(category) = detect_block(raw) {
            warn!(category = ?category, "Input blocked by sanitizer");
            return SanitizationResult::blocked(category);
        }

        let mut warnings = Vec::new();

        let text = remove_invisible_unicode(raw);
        if text.len() != raw.len() {
            warnings.push("Removed invisible Unicode characters".to_string());
        }

        let before = text.len();
        let text = remove_control_characters(&text);
        if text.len() != before {
            warnings.push("Removed control characters".to_string());
        }

        let text = strip_active_content(&text, &mut warnings);
        let text = escape_delimiters(&text);

        let char_count = text.chars().count();
        let text = if char_count > self.max_chars {
            let truncated = truncate_at_word_boundary(&text, self.max_chars);
            warnings.push(format!(
                "Input truncated from {} to {} characters",
                char_count,
                truncated.chars().count()
            ));
            truncated
        } else {
            text
        };

        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "Input sanitized with modifications");
        }

        SanitizationResult::passed(text, warnings)
    }
}

/// Sanitizes with the default length limit.
pub fn sanitize(raw: &str) -> SanitizationResult {
    InputSanitizer::default().sanitize(raw)
}

/// Returns the first block-tier category that matches.
///
/// Checked against the raw text and against a view with invisible and control
/// characters removed, so those characters cannot split a blocking phrase.
pub fn detect_block(raw: &str) -> Option<BlockCategory> {
    let normalized = remove_control_characters(&remove_invisible_unicode(raw));
    BLOCK_PATTERNS
        .iter()
        .find(|rule| rule.regex.is_match(raw) || rule.regex.is_match(&normalized))
        .map(|rule| rule.meta)
}

/// Rewrites fences and angle-bracket role tokens to inert look-alikes.
/// Applied unconditionally, including to text that is otherwise clean.
pub fn escape_delimiters(text: &str) -> String {
    ESCAPE_RULES.iter().fold(text.to_string(), |acc, rule| {
        rule.regex.replace_all(&acc, rule.meta).into_owned()
    })
}

fn strip_active_content(text: &str, warnings: &mut Vec<String>) -> String {
    let mut result = text.to_string();
    for rule in STRIP_PATTERNS.iter() {
        let hits = rule.regex.find_iter(&result).count();
        if hits == 0 {
            continue;
        }
        result = rule
            .regex
            .replace_all(&result, rule.meta.placeholder())
            .into_owned();
        warnings.extend(std::iter::repeat(rule.meta.warning().to_string()).take(hits));
    }
    result
}

/// Remove zero-width, bidi-control and other invisible Unicode characters.
fn remove_invisible_unicode(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}'..='\u{200F}'
                    | '\u{202A}'..='\u{202E}'
                    | '\u{2060}'..='\u{2064}'
                    | '\u{2066}'..='\u{2069}'
                    | '\u{FEFF}'
                    | '\u{00AD}'
                    | '\u{034F}'
                    | '\u{061C}'
                    | '\u{180E}'
            )
        })
        .collect()
}

/// Remove control characters except newline, carriage return and tab.
fn remove_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(*c, '\n' | '\r' | '\t'))
        .collect()
}

/// Truncate to at most `max_chars` characters, backing off to the last whitespace.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return text.to_string(),
    };
    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => truncated[..pos].trim_end().to_string(),
        _ => truncated.to_string(),
    }
}
