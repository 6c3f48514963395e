// AI content-generation pipeline: prompt assembly, provider orchestration,
// structured extraction and the coordinator that runs the safety stages.
// All model calls go through llm_client::TextProvider.

pub mod artifact;
pub mod extractor;
pub mod handlers;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod store;
