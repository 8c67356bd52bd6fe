//! quire-llm - Chat model providers for quire.
//!
//! Models are addressed by a provider-prefixed string such as
//! `ollama_chat/llama3.1:8b` or `openai/gpt-4o-mini`.
//!
//! # Supported Providers
//!
//! - **Ollama** (`ollama_chat/`, `ollama/`, or no prefix) - local models via `/api/chat`
//! - **OpenAI-compatible** (`openai/`) - any server exposing `/chat/completions`
//!
//! # Example
//!
//! ```ignore
//! use quire_llm::LlmFactory;
//!
//! let llm = LlmFactory::from_model("ollama_chat/llama3.1:8b")?;
//! let reply = llm.generate(&[Message::user("hi")], None).await?;
//! ```

mod factory;
mod model;
mod ollama;
mod openai;
mod tools;

pub use factory::LlmFactory;
pub use model::{LlmProvider, ModelRef};
pub use ollama::OllamaLlm;
pub use openai::OpenAiCompatibleLlm;

// Re-export core types for convenience
pub use quire_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ToolChoice};
