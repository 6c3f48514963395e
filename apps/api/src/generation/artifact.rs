//! Typed generation artifacts.
//!
//! `ArtifactContent` is what the structured extractor produces from model
//! output. It only becomes a `GeneratedArtifact` once the fabrication validator
//! has accepted it.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TailoredCv,
    CoverLetter,
}

impl ArtifactKind {
    /// Top-level fields the model must return, each with its accepted spellings.
    pub fn required_fields(self) -> &'static [&'static [&'static str]] {
        match self {
            ArtifactKind::TailoredCv => &[&["summary"], &["experience"], &["skills"]],
            ArtifactKind::CoverLetter => &[&["fullText", "full_text"]],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::TailoredCv => "tailored_cv",
            ArtifactKind::CoverLetter => "cover_letter",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailoredExperience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailoredCv {
    pub summary: String,
    pub experience: Vec<TailoredExperience>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CoverLetter {
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub opening: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub closing: String,
    #[serde(default)]
    pub signature: String,
    #[serde(alias = "full_text")]
    pub full_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum ArtifactContent {
    TailoredCv(TailoredCv),
    CoverLetter(CoverLetter),
}

impl ArtifactContent {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactContent::TailoredCv(_) => ArtifactKind::TailoredCv,
            ArtifactContent::CoverLetter(_) => ArtifactKind::CoverLetter,
        }
    }

    /// Every user-visible string in the artifact, one per line. This is the
    /// text the fabrication validator and bias detector see, and it covers
    /// every field the extractor accepts.
    pub fn text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        match self {
            ArtifactContent::TailoredCv(cv) => {
                parts.push(&cv.summary);
                for entry in &cv.experience {
                    parts.extend([
                        entry.title.as_str(),
                        entry.company.as_str(),
                        entry.dates.as_str(),
                    ]);
                    parts.extend(entry.bullets.iter().map(String::as_str));
                }
                parts.extend(cv.skills.iter().map(String::as_str));
                parts.extend(cv.highlights.iter().map(String::as_str));
            }
            ArtifactContent::CoverLetter(letter) => parts.extend([
                letter.greeting.as_str(),
                letter.opening.as_str(),
                letter.body.as_str(),
                letter.closing.as_str(),
                letter.signature.as_str(),
                letter.full_text.as_str(),
            ]),
        }
        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An artifact that passed every pipeline stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    #[serde(flatten)]
    pub content: ArtifactContent,
    /// The JSON object the content was parsed from. Holds no text outside the
    /// validated fields.
    pub raw_text: String,
}

impl GeneratedArtifact {
    /// Only the pipeline coordinator builds these, after validation.
    pub(crate) fn accepted(content: ArtifactContent, raw_text: String) -> Self {
        Self { content, raw_text }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.content.kind()
    }
}
