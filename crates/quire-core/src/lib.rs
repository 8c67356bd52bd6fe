//! quire-core - Core library for quire.
//!
//! This crate provides the shared types, traits, configuration and
//! in-memory services for the quire document agent.
//!
//! # Example
//!
//! ```ignore
//! use quire_core::{ArtifactStore, InMemoryArtifactService, InMemorySessionService, Artifact};
//!
//! let sessions = InMemorySessionService::new();
//! let artifacts = InMemoryArtifactService::new();
//!
//! let session = sessions.create_session("quire", "user1", None).await?;
//! artifacts
//!     .save_artifact(&session.key, Artifact::new("report.pdf", "report.pdf", "application/pdf", bytes))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{AgentConfig, AgentSettings};
pub use error::{ErrorCode, QuireError, QuireResult};
pub use services::{InMemoryArtifactService, InMemorySessionService, Session};
pub use traits::{ArtifactStore, GenerationOptions, Llm, LlmConfig, LlmResponse, Tool, ToolCall, ToolChoice};
pub use types::{
    Artifact, ArtifactId, ExtractionResult, ExtractionStatus, Message, MessageRole, SessionKey,
    DOCUMENT_EXTRACTION_KEY,
};
