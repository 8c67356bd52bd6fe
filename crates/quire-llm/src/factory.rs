//! Factory for creating LLM providers.

use std::sync::Arc;

use tracing::info;

use quire_core::error::QuireResult;
use quire_core::traits::{Llm, LlmConfig};

use crate::model::{LlmProvider, ModelRef};
use crate::ollama::OllamaLlm;
use crate::openai::OpenAiCompatibleLlm;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider. `config.model` must be the provider-local name.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> QuireResult<Arc<dyn Llm>> {
        info!(%provider, model = %config.model, "Creating LLM provider");
        match provider {
            LlmProvider::Ollama => Ok(Arc::new(OllamaLlm::new(config)?)),
            LlmProvider::OpenAi => Ok(Arc::new(OpenAiCompatibleLlm::new(config)?)),
        }
    }

    /// Create an LLM provider from a config whose model carries a provider prefix.
    pub fn from_config(mut config: LlmConfig) -> QuireResult<Arc<dyn Llm>> {
        let model = ModelRef::parse(&config.model)?;
        config.model = model.name;
        Self::create(model.provider, config)
    }

    /// Create an LLM provider from a model string with default settings.
    pub fn from_model(model: &str) -> QuireResult<Arc<dyn Llm>> {
        Self::from_config(LlmConfig {
            model: model.to_string(),
            ..Default::default()
        })
    }

    /// Create an Ollama LLM provider with a specific model.
    pub fn ollama_with_model(model: impl Into<String>) -> QuireResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Ollama, config)
    }
}
