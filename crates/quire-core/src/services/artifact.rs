//! In-memory artifact service.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::QuireResult;
use crate::traits::ArtifactStore;
use crate::types::{Artifact, ArtifactId, SessionKey};

/// All versions of one artifact, oldest first.
#[derive(Debug)]
struct VersionedArtifact {
    id: ArtifactId,
    versions: Vec<Artifact>,
}

/// Process-local artifact store.
///
/// Artifacts are versioned per id: saving an existing id appends a version
/// and `load_artifact` returns the newest. Key listing follows first-upload
/// order. Nothing outlives the process.
#[derive(Debug, Default)]
pub struct InMemoryArtifactService {
    sessions: RwLock<HashMap<SessionKey, Vec<VersionedArtifact>>>,
}

impl InMemoryArtifactService {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a specific version of an artifact.
    pub async fn load_artifact_version(
        &self,
        scope: &SessionKey,
        id: &ArtifactId,
        version: u32,
    ) -> QuireResult<Option<Artifact>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(scope)
            .and_then(|entries| entries.iter().find(|e| &e.id == id))
            .and_then(|entry| entry.versions.get(version as usize))
            .cloned())
    }

    /// List the version indexes stored for an artifact.
    pub async fn list_versions(&self, scope: &SessionKey, id: &ArtifactId) -> QuireResult<Vec<u32>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(scope)
            .and_then(|entries| entries.iter().find(|e| &e.id == id))
            .map(|entry| entry.versions.iter().map(|a| a.version).collect())
            .unwrap_or_default())
    }

    /// Drop every artifact belonging to a session.
    pub async fn clear_session(&self, scope: &SessionKey) {
        self.sessions.write().await.remove(scope);
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactService {
    async fn list_artifact_keys(&self, scope: &SessionKey) -> QuireResult<Vec<ArtifactId>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(scope)
            .map(|entries| entries.iter().map(|e| e.id.clone()).collect())
            .unwrap_or_default())
    }

    async fn load_artifact(
        &self,
        scope: &SessionKey,
        id: &ArtifactId,
    ) -> QuireResult<Option<Artifact>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(scope)
            .and_then(|entries| entries.iter().find(|e| &e.id == id))
            .and_then(|entry| entry.versions.last())
            .cloned())
    }

    async fn save_artifact(&self, scope: &SessionKey, mut artifact: Artifact) -> QuireResult<u32> {
        let mut sessions = self.sessions.write().await;
        let entries = sessions.entry(scope.clone()).or_default();

        let index = match entries.iter().position(|e| e.id == artifact.id) {
            Some(index) => index,
            None => {
                entries.push(VersionedArtifact {
                    id: artifact.id.clone(),
                    versions: Vec::new(),
                });
                entries.len() - 1
            }
        };

        let entry = &mut entries[index];
        let version = entry.versions.len() as u32;
        artifact.version = version;
        debug!(
            session = %scope,
            artifact_id = %artifact.id,
            version,
            bytes = artifact.len(),
            "Saved artifact"
        );
        entry.versions.push(artifact);
        Ok(version)
    }

    async fn delete_artifact(&self, scope: &SessionKey, id: &ArtifactId) -> QuireResult<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(entries) = sessions.get_mut(scope) {
            entries.retain(|e| &e.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> SessionKey {
        SessionKey::new("app", "user", "s1")
    }

    fn artifact(id: &str, bytes: &[u8]) -> Artifact {
        Artifact::new(id, id, "application/pdf", bytes)
    }

    #[tokio::test]
    async fn test_empty_session_lists_nothing() {
        let store = InMemoryArtifactService::new();
        assert!(store.list_artifact_keys(&scope()).await.unwrap().is_empty());
        assert!(store
            .load_artifact(&scope(), &ArtifactId::from("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_keys_follow_upload_order() {
        let store = InMemoryArtifactService::new();
        store.save_artifact(&scope(), artifact("b.pdf", b"1")).await.unwrap();
        store.save_artifact(&scope(), artifact("a.pdf", b"2")).await.unwrap();
        store.save_artifact(&scope(), artifact("b.pdf", b"3")).await.unwrap();

        let keys = store.list_artifact_keys(&scope()).await.unwrap();
        assert_eq!(keys, vec![ArtifactId::from("b.pdf"), ArtifactId::from("a.pdf")]);
    }

    #[tokio::test]
    async fn test_versions_and_latest() {
        let store = InMemoryArtifactService::new();
        let id = ArtifactId::from("doc.pdf");
        assert_eq!(store.save_artifact(&scope(), artifact("doc.pdf", b"v0")).await.unwrap(), 0);
        assert_eq!(store.save_artifact(&scope(), artifact("doc.pdf", b"v1")).await.unwrap(), 1);

        let latest = store.load_artifact(&scope(), &id).await.unwrap().unwrap();
        assert_eq!(&*latest.bytes, b"v1");
        assert_eq!(latest.version, 1);

        let first = store.load_artifact_version(&scope(), &id, 0).await.unwrap().unwrap();
        assert_eq!(&*first.bytes, b"v0");
        assert_eq!(store.list_versions(&scope(), &id).await.unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryArtifactService::new();
        store.save_artifact(&scope(), artifact("doc.pdf", b"x")).await.unwrap();

        let other = SessionKey::new("app", "user", "s2");
        assert!(store.list_artifact_keys(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryArtifactService::new();
        store.save_artifact(&scope(), artifact("a.pdf", b"x")).await.unwrap();
        store.save_artifact(&scope(), artifact("b.pdf", b"y")).await.unwrap();

        store.delete_artifact(&scope(), &ArtifactId::from("a.pdf")).await.unwrap();
        assert_eq!(
            store.list_artifact_keys(&scope()).await.unwrap(),
            vec![ArtifactId::from("b.pdf")]
        );

        store.clear_session(&scope()).await;
        assert!(store.list_artifact_keys(&scope()).await.unwrap().is_empty());
    }
}
