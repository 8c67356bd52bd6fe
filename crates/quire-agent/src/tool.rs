//! Function tools and the context they run in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use quire_core::error::QuireResult;
use quire_core::traits::{ArtifactStore, Tool};
use quire_core::types::{Artifact, ArtifactId, SessionKey};

/// Per-call context handed to a tool.
///
/// Gives read access to the session's artifacts and collects state entries
/// the tool wants merged into the session once the call has finished.
pub struct ToolContext {
    scope: SessionKey,
    artifacts: Arc<dyn ArtifactStore>,
    state: HashMap<String, Value>,
    function_call_id: Option<String>,
}

impl ToolContext {
    /// Create a context scoped to one session.
    pub fn new(scope: SessionKey, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            scope,
            artifacts,
            state: HashMap::new(),
            function_call_id: None,
        }
    }

    /// Attach the provider's id of the call being served.
    pub fn with_function_call_id(mut self, id: Option<String>) -> Self {
        self.function_call_id = id;
        self
    }

    /// Session this call belongs to.
    pub fn scope(&self) -> &SessionKey {
        &self.scope
    }

    pub fn function_call_id(&self) -> Option<&str> {
        self.function_call_id.as_deref()
    }

    /// List the session's artifacts in upload order.
    pub async fn list_artifacts(&self) -> QuireResult<Vec<ArtifactId>> {
        self.artifacts.list_artifact_keys(&self.scope).await
    }

    /// Load the latest version of an artifact.
    pub async fn load_artifact(&self, id: &ArtifactId) -> QuireResult<Option<Artifact>> {
        self.artifacts.load_artifact(&self.scope, id).await
    }

    /// State written during this call.
    pub fn state(&self) -> &HashMap<String, Value> {
        &self.state
    }

    pub fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Record a state entry, replacing any earlier value for `key`.
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    /// Consume the context, returning the state to merge into the session.
    pub fn into_state_delta(self) -> HashMap<String, Value> {
        self.state
    }
}

/// A tool the model can call by name.
#[async_trait]
pub trait FunctionTool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// What the tool does, shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments.
    fn parameters(&self) -> Value;

    /// Declaration sent to the model.
    fn declaration(&self) -> Tool {
        Tool::new(self.name(), self.description(), self.parameters())
    }

    /// Run the tool and return the text handed back to the model.
    async fn call(&self, ctx: &mut ToolContext, args: &HashMap<String, Value>)
        -> QuireResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::InMemoryArtifactService;
    use serde_json::json;

    fn context() -> ToolContext {
        ToolContext::new(
            SessionKey::new("quire", "u1", "s1"),
            Arc::new(InMemoryArtifactService::new()),
        )
    }

    #[test]
    fn test_state_delta() {
        let mut ctx = context().with_function_call_id(Some("call_7".to_string()));
        assert_eq!(ctx.function_call_id(), Some("call_7"));
        ctx.set_state("a", json!(1));
        ctx.set_state("a", json!(2));
        assert_eq!(ctx.get_state("a"), Some(&json!(2)));

        let delta = ctx.into_state_delta();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta["a"], json!(2));
    }

    #[tokio::test]
    async fn test_lists_scoped_artifacts() {
        let store = Arc::new(InMemoryArtifactService::new());
        let scope = SessionKey::new("quire", "u1", "s1");
        let other = SessionKey::new("quire", "u1", "s2");
        store
            .save_artifact(&other, Artifact::new("x.pdf", "x.pdf", "application/pdf", vec![1u8]))
            .await
            .unwrap();

        let ctx = ToolContext::new(scope, store);
        assert!(ctx.list_artifacts().await.unwrap().is_empty());
        assert!(ctx.load_artifact(&ArtifactId::new("x.pdf")).await.unwrap().is_none());
    }
}
