//! Artifact store trait.

use async_trait::async_trait;

use crate::error::QuireResult;
use crate::types::{Artifact, ArtifactId, SessionKey};

/// Keyed container of uploaded artifacts, scoped per session.
///
/// The document tool only reads through `list_artifact_keys` and
/// `load_artifact`; uploads go through `save_artifact`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// List artifact identifiers in the session, in upload order.
    async fn list_artifact_keys(&self, scope: &SessionKey) -> QuireResult<Vec<ArtifactId>>;

    /// Load the latest version of an artifact. Returns `None` if absent.
    async fn load_artifact(
        &self,
        scope: &SessionKey,
        id: &ArtifactId,
    ) -> QuireResult<Option<Artifact>>;

    /// Store an artifact as a new version and return the version index.
    async fn save_artifact(&self, scope: &SessionKey, artifact: Artifact) -> QuireResult<u32>;

    /// Remove every version of an artifact.
    async fn delete_artifact(&self, scope: &SessionKey, id: &ArtifactId) -> QuireResult<()>;
}
