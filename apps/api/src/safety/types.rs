use serde::{Deserialize, Serialize};

/// Why an input was rejected by the block tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionCategory {
    InstructionOverride,
    RoleManipulation,
    PromptExtraction,
    Jailbreak,
    EncodingBypass,
    DelimiterInjection,
}

impl InjectionCategory {
    pub fn label(self) -> &'static str {
        match self {
            InjectionCategory::InstructionOverride => "instruction override",
            InjectionCategory::RoleManipulation => "role manipulation",
            InjectionCategory::PromptExtraction => "system prompt extraction",
            InjectionCategory::Jailbreak => "jailbreak attempt",
            InjectionCategory::EncodingBypass => "encoding bypass",
            InjectionCategory::DelimiterInjection => "prompt delimiter injection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    PromptInjection(InjectionCategory),
    FabricationRequest,
}

impl BlockCategory {
    /// Human-readable reason. Names the category only, never the matched text.
    pub fn reason(self) -> String {
        match self {
            BlockCategory::PromptInjection(category) => {
                format!("Potential prompt injection detected ({})", category.label())
            }
            BlockCategory::FabricationRequest => {
                "Request to fabricate credentials or qualifications detected".to_string()
            }
        }
    }
}

/// Non-blocking cleanups applied by the strip tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripKind {
    ScriptTag,
    EventHandler,
    JavascriptUri,
}

impl StripKind {
    pub fn placeholder(self) -> &'static str {
        match self {
            StripKind::ScriptTag => "[removed-script]",
            StripKind::EventHandler => "[removed-handler]",
            StripKind::JavascriptUri => "[removed-uri]",
        }
    }

    pub fn warning(self) -> &'static str {
        match self {
            StripKind::ScriptTag => "Removed an embedded script tag",
            StripKind::EventHandler => "Removed an inline event handler attribute",
            StripKind::JavascriptUri => "Removed a javascript: URI",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizationResult {
    /// Empty whenever `blocked` is set.
    pub sanitized: String,
    pub warnings: Vec<String>,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(skip)]
    pub block_category: Option<BlockCategory>,
}

impl SanitizationResult {
    pub fn blocked(category: BlockCategory) -> Self {
        Self {
            sanitized: String::new(),
            warnings: Vec::new(),
            blocked: true,
            block_reason: Some(category.reason()),
            block_category: Some(category),
        }
    }

    pub fn passed(sanitized: String, warnings: Vec<String>) -> Self {
        Self {
            sanitized,
            warnings,
            blocked: false,
            block_reason: None,
            block_category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasCategory {
    Gender,
    Age,
    EthnicOrigin,
}

impl BiasCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            BiasCategory::Gender => "gender",
            BiasCategory::Age => "age",
            BiasCategory::EthnicOrigin => "ethnic_origin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasFinding {
    pub category: BiasCategory,
    pub matched_text: String,
    pub suggestion: String,
    #[serde(skip)]
    pub offset: usize,
}

/// Advisory only. Never blocks a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasReport {
    pub has_bias: bool,
    pub findings: Vec<BiasFinding>,
}

/// The shape of credential being asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Certification,
    Degree,
    Employment,
    YearsOfExperience,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub suspicious_claims: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn from_findings(suspicious_claims: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: suspicious_claims.is_empty(),
            suspicious_claims,
            warnings,
        }
    }
}
