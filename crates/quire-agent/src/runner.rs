//! Conversation runner: stores uploads, drives the model and executes tools.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use quire_core::error::{QuireError, QuireResult};
use quire_core::traits::{ArtifactStore, ToolCall, ToolChoice};
use quire_core::types::{Artifact, Message, SessionKey};
use quire_core::InMemorySessionService;

use crate::agent::Agent;
use crate::tool::ToolContext;

/// Default bound on model round-trips spent on tool calls per turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 4;

/// A file attached to a user turn.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> QuireResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, mime_for_path(path), bytes))
    }
}

/// `application/pdf` for `.pdf` files, `application/octet-stream` otherwise.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// One user turn.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub uploads: Vec<Upload>,
}

impl UserInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            uploads: Vec::new(),
        }
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.uploads.push(upload);
        self
    }

    pub fn with_uploads(mut self, uploads: impl IntoIterator<Item = Upload>) -> Self {
        self.uploads.extend(uploads);
        self
    }

    /// Text of the user message, noting any uploaded file names.
    fn message_text(&self) -> String {
        if self.uploads.is_empty() {
            return self.text.clone();
        }
        let names = self
            .uploads
            .iter()
            .map(|u| u.file_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if self.text.trim().is_empty() {
            format!("[Uploaded files: {}]", names)
        } else {
            format!("{}\n\n[Uploaded files: {}]", self.text, names)
        }
    }
}

/// Runs user turns against an agent within stored sessions.
pub struct Runner {
    app_name: String,
    agent: Arc<Agent>,
    sessions: Arc<InMemorySessionService>,
    artifacts: Arc<dyn ArtifactStore>,
    max_tool_rounds: usize,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        agent: Arc<Agent>,
        sessions: Arc<InMemorySessionService>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            agent,
            sessions,
            artifacts,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Bound the number of tool rounds per turn (at least one).
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Run one user turn and return the agent's reply.
    ///
    /// The session must exist. Uploads are stored as artifacts before the
    /// model sees the turn.
    pub async fn run(&self, user_id: &str, session_id: &str, input: UserInput) -> QuireResult<String> {
        let key = SessionKey::new(&self.app_name, user_id, session_id);
        let session = self
            .sessions
            .get_session(&key)
            .await?
            .ok_or_else(|| QuireError::session_not_found(session_id))?;

        for upload in &input.uploads {
            let artifact = Artifact::new(
                upload.file_name.as_str(),
                upload.file_name.as_str(),
                upload.mime_type.as_str(),
                Arc::clone(&upload.bytes),
            );
            let version = self.artifacts.save_artifact(&key, artifact).await?;
            info!(
                session = %key,
                file = %upload.file_name,
                mime = %upload.mime_type,
                bytes = upload.bytes.len(),
                version,
                "Stored upload"
            );
        }

        let user_message = Message::user(input.message_text());
        self.sessions.append_message(&key, user_message.clone()).await?;

        let mut messages = Vec::with_capacity(session.messages.len() + 2);
        if !self.agent.instruction().is_empty() {
            messages.push(Message::system(self.agent.instruction()));
        }
        messages.extend(session.messages);
        messages.push(user_message);

        let llm = self.agent.llm();
        let declarations = if llm.supports_tools() {
            self.agent.declarations()
        } else {
            warn!(model = llm.model_name(), "Model cannot call tools; running without them");
            Vec::new()
        };

        for round in 0..self.max_tool_rounds {
            let response = if declarations.is_empty() {
                llm.generate(&messages, Some(self.agent.generation().clone()))
                    .await?
            } else {
                llm.generate_with_tools(
                    &messages,
                    &declarations,
                    ToolChoice::Auto,
                    Some(self.agent.generation().clone()),
                )
                .await?
            };
            if let Some(usage) = &response.usage {
                debug!(
                    session = %key,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Model usage"
                );
            }

            if !response.has_tool_calls() {
                return self.finish(&key, response.content_or_empty()).await;
            }

            debug!(session = %key, round, calls = response.tool_calls.len(), "Model requested tools");
            let assistant = Message::assistant_tool_calls(
                response.content_or_empty(),
                response.tool_calls.clone(),
            );
            self.sessions.append_message(&key, assistant.clone()).await?;
            messages.push(assistant);

            for call in &response.tool_calls {
                let output = self.execute(&key, call).await?;
                let tool_message = Message::tool_result(call, output);
                self.sessions.append_message(&key, tool_message.clone()).await?;
                messages.push(tool_message);
            }
        }

        // Out of tool rounds: ask for a plain answer.
        warn!(session = %key, rounds = self.max_tool_rounds, "Tool round limit reached");
        let response = llm
            .generate(&messages, Some(self.agent.generation().clone()))
            .await?;
        self.finish(&key, response.content_or_empty()).await
    }

    /// Execute one tool call and merge its state into the session.
    async fn execute(&self, key: &SessionKey, call: &ToolCall) -> QuireResult<String> {
        let Some(tool) = self.agent.find_tool(&call.name) else {
            let err = QuireError::unknown_tool(&call.name);
            warn!(session = %key, tool = %call.name, "Model called an unknown tool");
            return Ok(format!("Error: {}", err));
        };

        let mut ctx = ToolContext::new(key.clone(), Arc::clone(&self.artifacts))
            .with_function_call_id(call.id.clone());
        let output = match tool.call(&mut ctx, &call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!(session = %key, tool = %call.name, error = %e, "Tool failed");
                format!("Error: {}", e)
            }
        };

        let delta = ctx.into_state_delta();
        if !delta.is_empty() {
            self.sessions.update_state(key, delta).await?;
        }
        debug!(session = %key, tool = %call.name, output = %output, "Tool finished");
        Ok(output)
    }

    async fn finish(&self, key: &SessionKey, reply: &str) -> QuireResult<String> {
        self.sessions
            .append_message(key, Message::assistant(reply))
            .await?;
        Ok(reply.to_string())
    }
}
