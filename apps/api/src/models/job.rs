use serde::{Deserialize, Serialize};

/// A job posting as supplied by the job-ingestion service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl JobPosting {
    /// Flattens the posting into the free text that goes through input sanitization.
    pub fn as_request_text(&self) -> String {
        let mut text = format!("Job title: {}\n", self.title.trim());
        if !self.company.trim().is_empty() {
            text.push_str(&format!("Company: {}\n", self.company.trim()));
        }
        if !self.description.trim().is_empty() {
            text.push_str("\nDescription:\n");
            text.push_str(self.description.trim());
            text.push('\n');
        }
        if !self.requirements.is_empty() {
            text.push_str("\nRequirements:\n");
            for requirement in &self.requirements {
                text.push_str(&format!("- {}\n", requirement.trim()));
            }
        }
        text
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Enthusiastic,
    Formal,
    Conversational,
}

impl Tone {
    pub fn instruction(self) -> &'static str {
        match self {
            Tone::Professional => "professional and confident, without hype",
            Tone::Enthusiastic => "warm and enthusiastic, while staying factual",
            Tone::Formal => "formal and restrained",
            Tone::Conversational => "friendly and conversational, but still professional",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Length {
    Short,
    #[default]
    Medium,
    Long,
}

impl Length {
    pub fn instruction(self) -> &'static str {
        match self {
            Length::Short => "concise: roughly 150 words of prose in total",
            Length::Medium => "moderate: roughly 300 words of prose in total",
            Length::Long => "detailed: roughly 450 words of prose in total",
        }
    }
}

/// Per-request generation options from the request layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub length: Length,
}
