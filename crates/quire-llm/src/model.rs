//! Provider-prefixed model identifiers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use quire_core::error::{QuireError, QuireResult};

/// Chat model backends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Local Ollama server.
    #[default]
    #[strum(to_string = "ollama", serialize = "ollama_chat")]
    Ollama,
    /// Any OpenAI-compatible chat completions server.
    #[strum(to_string = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
}

/// A model string split into provider and provider-local model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub provider: LlmProvider,
    pub name: String,
}

impl ModelRef {
    /// Parse `provider/model`. A string without a provider prefix is an Ollama model.
    pub fn parse(model: &str) -> QuireResult<Self> {
        let model = model.trim();
        if model.is_empty() {
            return Err(QuireError::Configuration("model must not be empty".to_string()));
        }

        let Some((prefix, name)) = model.split_once('/') else {
            return Ok(Self {
                provider: LlmProvider::Ollama,
                name: model.to_string(),
            });
        };

        let provider = prefix
            .parse::<LlmProvider>()
            .map_err(|_| QuireError::UnsupportedProvider {
                provider: prefix.to_string(),
            })?;
        if name.is_empty() {
            return Err(QuireError::Configuration(format!(
                "model '{}' has no name after the provider prefix",
                model
            )));
        }

        Ok(Self {
            provider,
            name: name.to_string(),
        })
    }
}
