//! In-memory session service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{QuireError, QuireResult};
use crate::types::{Message, SessionKey};

/// Conversation history and state for one user interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    /// Free-form state written by tools and the runner.
    #[serde(default)]
    pub state: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: HashMap::new(),
            messages: Vec::new(),
            last_update_time: Utc::now(),
        }
    }

    /// Session id shorthand.
    pub fn id(&self) -> &str {
        &self.key.session_id
    }
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session. A random id is generated when `session_id` is `None`.
    pub async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
    ) -> QuireResult<Session> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = SessionKey::new(app_name, user_id, session_id);

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(QuireError::validation_with_suggestion(
                format!("Session '{}' already exists", key.session_id),
                "Use get_session to resume an existing session",
            ));
        }

        let session = Session::new(key.clone());
        sessions.insert(key.clone(), session.clone());
        debug!(session = %key, "Created session");
        Ok(session)
    }

    /// Fetch a snapshot of a session.
    pub async fn get_session(&self, key: &SessionKey) -> QuireResult<Option<Session>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    /// List the sessions of one user.
    pub async fn list_sessions(&self, app_name: &str, user_id: &str) -> QuireResult<Vec<SessionKey>> {
        let sessions = self.sessions.read().await;
        let mut keys: Vec<SessionKey> = sessions
            .keys()
            .filter(|k| k.app_name == app_name && k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(keys)
    }

    /// Append a message to the session history.
    pub async fn append_message(&self, key: &SessionKey, message: Message) -> QuireResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| QuireError::session_not_found(&key.session_id))?;
        session.messages.push(message);
        session.last_update_time = Utc::now();
        Ok(())
    }

    /// Merge entries into the session state, overwriting existing keys.
    pub async fn update_state(
        &self,
        key: &SessionKey,
        delta: HashMap<String, serde_json::Value>,
    ) -> QuireResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| QuireError::session_not_found(&key.session_id))?;
        session.state.extend(delta);
        session.last_update_time = Utc::now();
        Ok(())
    }

    /// Delete a session. Deleting an unknown session is a no-op.
    pub async fn delete_session(&self, key: &SessionKey) -> QuireResult<()> {
        if self.sessions.write().await.remove(key).is_some() {
            debug!(session = %key, "Deleted session");
        }
        Ok(())
    }
}
