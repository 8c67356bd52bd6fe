//! quire-agent - Document agent shell.
//!
//! Wires a chat model to the `check_uploaded_document` tool: uploads are
//! stored as session artifacts, the model decides when to call the tool, and
//! the tool's structured result lands in the session state under
//! `document_extraction`.
//!
//! # Example
//!
//! ```ignore
//! use quire_agent::{document_agent, Runner, Upload, UserInput};
//!
//! let agent = Arc::new(document_agent(&config, llm)?);
//! let runner = Runner::new("quire", agent, sessions.clone(), artifacts);
//! let session = sessions.create_session("quire", "user1", None).await?;
//! let reply = runner
//!     .run("user1", session.id(), UserInput::new("Here you go").with_upload(upload))
//!     .await?;
//! ```

mod agent;
mod document;
mod runner;
mod tool;

pub use agent::{document_agent, Agent, AgentBuilder};
pub use document::{CheckDocumentArgs, DocumentTool, CHECK_UPLOADED_DOCUMENT};
pub use runner::{mime_for_path, Runner, Upload, UserInput, DEFAULT_MAX_TOOL_ROUNDS};
pub use tool::{FunctionTool, ToolContext};
