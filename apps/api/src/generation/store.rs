//! Artifact persistence seam.
//!
//! Real persistence belongs to an external service. `AppState` holds an
//! `Arc<dyn ArtifactStore>`; the default backend keeps artifacts in memory.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::generation::artifact::GeneratedArtifact;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub artifact: GeneratedArtifact,
}

/// Receives only artifacts that reached `Accepted`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save(&self, artifact: GeneratedArtifact) -> Result<StoredArtifact>;

    async fn get(&self, id: Uuid) -> Result<Option<StoredArtifact>>;
}

#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: RwLock<HashMap<Uuid, StoredArtifact>>,
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn save(&self, artifact: GeneratedArtifact) -> Result<StoredArtifact> {
        let stored = StoredArtifact {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            artifact,
        };
        self.artifacts
            .write()
            .await
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredArtifact>> {
        Ok(self.artifacts.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::artifact::{ArtifactContent, ArtifactKind, CoverLetter};

    fn letter() -> GeneratedArtifact {
        GeneratedArtifact::accepted(
            ArtifactContent::CoverLetter(CoverLetter {
                greeting: "Dear team,".to_string(),
                opening: String::new(),
                body: String::new(),
                closing: String::new(),
                signature: "Sam Lee".to_string(),
                full_text: "Dear team, hello.".to_string(),
            }),
            "{\"fullText\": \"Dear team, hello.\"}".to_string(),
        )
    }

    #[tokio::test]
    async fn test_saved_artifact_can_be_fetched() {
        let store = InMemoryArtifactStore::default();
        let stored = store.save(letter()).await.unwrap();

        let fetched = store.get(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.artifact.kind(), ArtifactKind::CoverLetter);
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let store = InMemoryArtifactStore::default();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_each_save_gets_a_fresh_id() {
        let store = InMemoryArtifactStore::default();
        let a = store.save(letter()).await.unwrap();
        let b = store.save(letter()).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
