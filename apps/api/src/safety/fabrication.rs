//! Fabrication Validator: cross-checks claim-shaped phrases in generated text
//! against the candidate's verified profile.
//!
//! Algorithm:
//! 1. Find certification, degree, employment and years-of-experience claims.
//! 2. Lowercase each claim and look for any verified profile term inside it
//!    (word-bounded substring containment). Skills count only for
//!    years-of-experience claims.
//! 3. A claim with no verified term is suspicious.
//! 4. Any suspicious claim invalidates the whole artifact.
//!
//! This is a conservative pattern heuristic, not semantic entailment. It misses
//! paraphrased fabrications and can flag legitimate claims worded differently
//! from the profile.

use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::models::profile::ValidationContext;
use crate::safety::patterns::{
    claim_stop_words, CLAIM_FILLER_WORDS, CLAIM_PATTERNS, DURATION_WORDS,
};
use crate::safety::types::{ClaimKind, ValidationResult};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19[5-9]\d|20\d\d)\b").expect("valid regex"));
static ONGOING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:present|current|now|today)\b").expect("valid regex"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}").expect("valid regex"));

/// How a claim is matched against verified profile terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Containment {
    /// The claim must contain a verified term.
    #[default]
    ClaimContainsTerm,
    /// Additionally accept a claim whose entity appears inside a verified term,
    /// e.g. "degree in Computer Science" against "BSc Computer Science".
    Bidirectional,
}

#[derive(Debug, Error)]
#[error("unknown containment rule '{0}' (expected claim_contains_term or bidirectional)")]
pub struct UnknownContainment(String);

impl FromStr for Containment {
    type Err = UnknownContainment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claim_contains_term" => Ok(Containment::ClaimContainsTerm),
            "bidirectional" => Ok(Containment::Bidirectional),
            _ => Err(UnknownContainment(s.to_string())),
        }
    }
}

/// Minimum entity length for the reverse direction of `Containment::Bidirectional`.
const MIN_REVERSE_ENTITY_LEN: usize = 3;

/// A claim-shaped phrase found in generated text.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub kind: ClaimKind,
    /// The phrase as written, e.g. "worked at Google".
    pub text: String,
    /// The asserted entity, e.g. "Google".
    pub entity: String,
    span: Range<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FabricationValidator {
    containment: Containment,
}

impl FabricationValidator {
    pub fn new(containment: Containment) -> Self {
        Self { containment }
    }

    pub fn validate(&self, artifact_text: &str, context: &ValidationContext) -> ValidationResult {
        let mut warnings = Vec::new();

        if context.is_empty() {
            warnings.push(
                "Validation context is empty; every claim is treated as unverified".to_string(),
            );
        }

        let claims = extract_claims(artifact_text);
        let span = profile_year_span(context);
        let mut suspicious = Vec::new();

        for claim in &claims {
            if !self.is_verified(claim, &context.verified_terms(claim.kind)) {
                suspicious.push(claim.text.clone());
            }

            if claim.kind == ClaimKind::YearsOfExperience {
                if let (Some(claimed), Some(span)) = (claimed_years(&claim.text), span) {
                    if claimed > span {
                        warnings.push(format!(
                            "Claimed {claimed} years of experience exceeds the {span}-year span covered by the profile"
                        ));
                    }
                }
            }
        }

        debug!(
            claims = claims.len(),
            suspicious = suspicious.len(),
            "Fabrication validation complete"
        );

        ValidationResult::from_findings(suspicious, warnings)
    }

    fn is_verified(&self, claim: &Claim, terms: &[String]) -> bool {
        let claim_lower = claim.text.to_lowercase();
        if terms.iter().any(|term| contains_term(&claim_lower, term)) {
            return true;
        }

        match self.containment {
            Containment::ClaimContainsTerm => false,
            Containment::Bidirectional => {
                let entity = claim.entity.to_lowercase();
                entity.chars().count() >= MIN_REVERSE_ENTITY_LEN
                    && terms.iter().any(|term| contains_term(term, &entity))
            }
        }
    }
}

/// Validates with the default containment rule.
pub fn validate(artifact_text: &str, context: &ValidationContext) -> ValidationResult {
    FabricationValidator::default().validate(artifact_text, context)
}

/// Finds every claim-shaped phrase, in text order.
///
/// Each search resumes where the previous claim's trimmed entity ended, so a
/// greedy entity cannot swallow a second claim in the same sentence.
pub fn extract_claims(text: &str) -> Vec<Claim> {
    let mut claims: Vec<Claim> = Vec::new();

    for rule in CLAIM_PATTERNS.iter() {
        let kind = rule.meta;
        let mut position = 0;

        while let Some(caps) = rule.regex.captures_at(text, position) {
            let (Some(whole), Some(entity)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            // Resume after the keyword when this match yields no claim.
            position = entity.start().max(whole.start() + 1);

            let Some(kept) = trim_entity(entity.as_str(), kind) else {
                continue;
            };
            let entity_text = &entity.as_str()[kept.clone()];
            if kind == ClaimKind::Employment && is_duration(entity_text) {
                continue;
            }

            let entity_start = entity.start() + kept.start;
            let end = entity.start() + kept.end;
            let start = skip_filler(text, whole.start(), entity_start);
            let span = start..end;
            position = end;

            let overlaps = claims
                .iter()
                .any(|c| c.kind == kind && c.span.start < span.end && span.start < c.span.end);
            if overlaps {
                continue;
            }

            claims.push(Claim {
                kind,
                text: text[span.clone()].to_string(),
                entity: entity_text.to_string(),
                span,
            });
        }
    }

    claims.sort_by_key(|c| c.span.start);
    claims
}

/// Cuts the entity at the first stop word. Returns the kept byte range, or
/// `None` when the entity opens with a stop word.
fn trim_entity(entity: &str, kind: ClaimKind) -> Option<Range<usize>> {
    let stops = claim_stop_words(kind);
    let mut kept: Option<Range<usize>> = None;
    for word in WORD.find_iter(entity) {
        let normalized = word
            .as_str()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if stops.contains(&normalized.as_str()) {
            break;
        }
        kept = Some(match kept {
            Some(range) => range.start..word.end(),
            None => word.start()..word.end(),
        });
    }
    kept
}

/// Advances past leading filler words ("I am a ...") without crossing `limit`.
fn skip_filler(text: &str, start: usize, limit: usize) -> usize {
    let mut position = start;
    for word in WORD.find_iter(&text[start..limit]) {
        if CLAIM_FILLER_WORDS.contains(&word.as_str().to_lowercase().as_str()) {
            position = start + word.end();
        } else {
            return start + word.start();
        }
    }
    position
}

/// "worked for 5 years" / "worked for over a decade" assert a duration, not an employer.
fn is_duration(entity: &str) -> bool {
    let first = entity
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    first.starts_with(|c: char| c.is_ascii_digit()) || DURATION_WORDS.contains(&first.as_str())
}

/// Substring containment where the needle must sit on word boundaries.
fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Years between the earliest and latest dates in the profile's work history.
fn profile_year_span(context: &ValidationContext) -> Option<u32> {
    let current_year = Utc::now().year();
    let mut years: Vec<i32> = Vec::new();

    for entry in context.experience() {
        years.extend(
            YEAR.find_iter(&entry.dates)
                .filter_map(|m| m.as_str().parse::<i32>().ok()),
        );
        if ONGOING.is_match(&entry.dates) {
            years.push(current_year);
        }
    }

    let min = years.iter().min()?;
    let max = years.iter().max()?;
    u32::try_from(max - min).ok()
}

fn claimed_years(claim_text: &str) -> Option<u32> {
    LEADING_NUMBER
        .find(claim_text)
        .and_then(|m| m.as_str().parse().ok())
}
