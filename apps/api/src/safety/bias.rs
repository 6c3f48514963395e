//! Bias Detector: advisory scan for gender-, age- and origin-coded phrasing.
//!
//! Used on both submitted text and generated artifacts. Never blocks.

use tracing::debug;

use crate::safety::patterns::{BIAS_PATTERNS, BIAS_SUGGESTIONS, GENERIC_BIAS_SUGGESTION};
use crate::safety::types::{BiasCategory, BiasFinding, BiasReport};

pub fn detect_bias(text: &str) -> BiasReport {
    let mut findings: Vec<BiasFinding> = BIAS_PATTERNS
        .iter()
        .flat_map(|rule| {
            rule.regex.find_iter(text).map(move |m| BiasFinding {
                category: rule.meta,
                matched_text: m.as_str().to_string(),
                suggestion: suggest(rule.meta, m.as_str()),
                offset: m.start(),
            })
        })
        .collect();

    findings.sort_by_key(|f| f.offset);
    findings.dedup_by(|a, b| a.offset == b.offset && a.category == b.category);

    for finding in &findings {
        debug!(
            category = finding.category.as_str(),
            matched = %finding.matched_text,
            "Bias finding"
        );
    }

    BiasReport {
        has_bias: !findings.is_empty(),
        findings,
    }
}

fn suggest(category: BiasCategory, matched: &str) -> String {
    let normalized = matched
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    BIAS_SUGGESTIONS
        .iter()
        .find(|(cat, key, _)| *cat == category && normalized.starts_with(key))
        .map(|(_, _, replacement)| format!("Consider \"{replacement}\" instead of \"{matched}\""))
        .unwrap_or_else(|| GENERIC_BIAS_SUGGESTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manpower_is_gender_coded() {
        let report = detect_bias("We need more manpower");
        assert!(report.has_bias);
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.category, BiasCategory::Gender);
        assert_eq!(finding.category.as_str(), "gender");
        assert_eq!(finding.matched_text, "manpower");
        assert!(finding.suggestion.contains("workforce"));
    }

    #[test]
    fn test_multiple_findings_in_text_order() {
        let report = detect_bias(
            "Looking for a young and dynamic salesman, native English speakers preferred.",
        );
        let categories: Vec<_> = report.findings.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![
                BiasCategory::Age,
                BiasCategory::Gender,
                BiasCategory::EthnicOrigin
            ]
        );
        assert_eq!(report.findings[0].matched_text, "young and dynamic");
        assert!(report.findings[1].suggestion.contains("salesperson"));
        assert!(report.findings[2].suggestion.contains("fluent English speaker"));
    }

    #[test]
    fn test_unknown_phrase_falls_back_to_generic_guidance() {
        let report = detect_bias("Only American-born applicants");
        assert!(report.has_bias);
        assert_eq!(report.findings[0].category, BiasCategory::EthnicOrigin);
        assert_eq!(report.findings[0].suggestion, GENERIC_BIAS_SUGGESTION);
    }

    #[test]
    fn test_neutral_text_has_no_findings() {
        let report = detect_bias("We are hiring a backend engineer to grow our workforce.");
        assert!(!report.has_bias);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_words_containing_terms_are_not_flagged() {
        // "manage" and "germany" contain "man" but are not gendered terms
        let report = detect_bias("Manage a team in Germany");
        assert!(!report.has_bias);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(detect_bias("Hey guys")).unwrap();
        assert_eq!(json["hasBias"], true);
        assert_eq!(json["findings"][0]["category"], "gender");
        assert_eq!(json["findings"][0]["matchedText"], "guys");
        assert!(json["findings"][0].get("offset").is_none());
    }
}
