//! Core traits for quire providers and services.

mod artifact_store;
mod llm;

pub use artifact_store::*;
pub use llm::*;
