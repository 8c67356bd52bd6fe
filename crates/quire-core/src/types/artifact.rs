//! Uploaded artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque artifact identifier, unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Create an identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArtifactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A binary blob uploaded by the user.
///
/// The byte buffer is shared and immutable; cloning an artifact never copies
/// the payload.
#[derive(Clone)]
pub struct Artifact {
    pub id: ArtifactId,
    pub display_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
    /// Version index assigned by the store, starting at 0.
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Create a new unversioned artifact.
    pub fn new(
        id: impl Into<ArtifactId>,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .field("version", &self.version)
            .field("created_at", &self.created_at)
            .finish()
    }
}
