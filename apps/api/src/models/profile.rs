use serde::{Deserialize, Serialize};

use crate::safety::types::ClaimKind;

/// A single role from the candidate's stored work history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    /// Free-form date range as stored by the profile service, e.g. "2019 - 2023".
    #[serde(default)]
    pub dates: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub year: String,
}

/// The candidate profile as supplied by the profile-storage service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// Ground truth for fabrication checks.
///
/// Only constructible from a stored `CandidateProfile`. Fields are private and
/// exposed read-only, so nothing the model returns can ever flow back into it.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    skills: Vec<String>,
    experience: Vec<ExperienceEntry>,
    education: Vec<EducationEntry>,
    certifications: Vec<String>,
}

impl ValidationContext {
    pub fn from_profile(profile: &CandidateProfile) -> Self {
        Self {
            skills: profile.skills.clone(),
            experience: profile.experience.clone(),
            education: profile.education.clone(),
            certifications: profile.certifications.clone(),
        }
    }

    pub fn experience(&self) -> &[ExperienceEntry] {
        &self.experience
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.experience.is_empty()
            && self.education.is_empty()
            && self.certifications.is_empty()
    }

    /// Every non-blank fact that can verify a claim of `kind`, lowercased and
    /// trimmed.
    ///
    /// Skills only back years-of-experience claims. A listed skill is not
    /// evidence of a certification, degree or employer with the same name.
    /// Blank entries are skipped: an empty needle would be contained in every claim.
    pub fn verified_terms(&self, kind: ClaimKind) -> Vec<String> {
        let skills: &[String] = match kind {
            ClaimKind::YearsOfExperience => &self.skills,
            _ => &[],
        };
        let experience = self
            .experience
            .iter()
            .flat_map(|e| [e.title.as_str(), e.company.as_str()]);
        let education = self
            .education
            .iter()
            .flat_map(|e| [e.degree.as_str(), e.institution.as_str()]);

        self.certifications
            .iter()
            .map(String::as_str)
            .chain(experience)
            .chain(education)
            .chain(skills.iter().map(String::as_str))
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect()
    }
}
