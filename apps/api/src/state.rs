use std::sync::Arc;

use crate::generation::pipeline::GenerationPipeline;
use crate::generation::store::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stateless apart from read-only catalogues; shared by every request.
    pub pipeline: Arc<GenerationPipeline>,
    /// Pluggable persistence collaborator. Default: InMemoryArtifactStore.
    pub store: Arc<dyn ArtifactStore>,
}
