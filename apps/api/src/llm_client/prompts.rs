// Cross-cutting system prompt fragments.
// Task-specific templates and the safety preamble live in generation::prompts.

/// System prompt sent with every generation call. The structured extractor
/// still falls back to brace matching when the model ignores it.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant \
    that tailors job application documents. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
