//! Structured Extractor: pulls a typed artifact out of sanitized model output.
//!
//! The model is asked for bare JSON, but replies still arrive wrapped in code
//! fences or surrounded by prose. Extraction takes the first balanced
//! brace-delimited object, parses it, checks the required fields for the
//! artifact kind, then deserializes into the typed shape. Anything outside that
//! object is dropped here and never reaches the caller.
//!
//! Both failure kinds are terminal. Nothing here is retried.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::generation::artifact::{ArtifactContent, ArtifactKind, CoverLetter, TailoredCv};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("unparseable response: {0}")]
    UnparseableResponse(String),

    #[error("invalid {kind} structure: {reason}")]
    InvalidArtifactStructure { kind: ArtifactKind, reason: String },
}

/// A typed artifact and the JSON object it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub content: ArtifactContent,
    /// The balanced object only, without surrounding prose or fences.
    pub json: String,
}

pub fn extract(sanitized: &str, kind: ArtifactKind) -> Result<Extracted, ExtractionError> {
    let text = strip_json_fences(sanitized);

    let object = first_balanced_object(text).ok_or_else(|| {
        ExtractionError::UnparseableResponse("no balanced JSON object found".to_string())
    })?;

    let value: Value = serde_json::from_str(object)
        .map_err(|e| ExtractionError::UnparseableResponse(e.to_string()))?;

    let invalid = |reason: String| ExtractionError::InvalidArtifactStructure { kind, reason };

    let Value::Object(fields) = &value else {
        return Err(invalid("top-level value is not an object".to_string()));
    };

    let missing = missing_fields(fields, kind);
    if !missing.is_empty() {
        return Err(invalid(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    let content = match kind {
        ArtifactKind::TailoredCv => serde_json::from_value::<TailoredCv>(value)
            .map(ArtifactContent::TailoredCv)
            .map_err(|e| invalid(e.to_string()))?,
        ArtifactKind::CoverLetter => serde_json::from_value::<CoverLetter>(value)
            .map(ArtifactContent::CoverLetter)
            .map_err(|e| invalid(e.to_string()))?,
    };

    Ok(Extracted {
        content,
        json: object.to_string(),
    })
}

/// A required field counts as absent when missing, null, or a blank string.
fn missing_fields(fields: &Map<String, Value>, kind: ArtifactKind) -> Vec<&'static str> {
    kind.required_fields()
        .iter()
        .filter(|spellings| {
            !spellings
                .iter()
                .any(|name| fields.get(*name).is_some_and(is_present))
        })
        .map(|spellings| spellings[0])
        .collect()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Returns the first `{...}` substring whose braces balance, skipping braces
/// inside JSON string literals.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
