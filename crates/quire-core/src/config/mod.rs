//! Configuration system for quire.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QuireError, QuireResult};
use crate::traits::LlmConfig;

/// Default instruction for the document agent.
pub const DEFAULT_INSTRUCTION: &str = "You are a helpful assistant powered by a local LLM. \
When the user has uploaded a document, call the check_uploaded_document tool and relay \
its message to confirm the upload. If nothing was uploaded, reply conversationally.";

/// Identity and prompt of the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Agent name shown in logs and transcripts.
    pub name: String,
    /// Short description of what the agent does.
    pub description: String,
    /// System instruction given to the model.
    pub instruction: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "DocumentAgent".to_string(),
            description: "An agent that checks uploaded PDF documents using a local LLM."
                .to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Application name used to scope sessions and artifacts.
    pub app_name: String,
    /// Agent identity and instruction.
    pub agent: AgentSettings,
    /// Chat model configuration.
    pub llm: LlmConfig,
    /// Maximum model round-trips spent on tool calls per user turn.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: "quire".to_string(),
            agent: AgentSettings::default(),
            llm: LlmConfig::default(),
            max_tool_rounds: 4,
        }
    }
}

impl AgentConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> QuireResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| QuireError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| QuireError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| QuireError::Configuration(e.to_string()))?,
            _ => {
                return Err(QuireError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(app_name) = std::env::var("QUIRE_APP_NAME") {
            self.app_name = app_name;
        }
        if let Ok(model) = std::env::var("QUIRE_MODEL") {
            self.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("QUIRE_LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        } else if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if self.llm.base_url.is_none() {
                self.llm.base_url = Some(host);
            }
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if self.llm.api_key.is_none() {
                self.llm.api_key = Some(api_key);
            }
        }
        if let Some(rounds) = std::env::var("QUIRE_MAX_TOOL_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_tool_rounds = rounds;
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> QuireResult<()> {
        if self.app_name.trim().is_empty() {
            return Err(QuireError::Configuration("app_name must not be empty".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(QuireError::Configuration("llm.model must not be empty".to_string()));
        }
        if self.max_tool_rounds == 0 {
            return Err(QuireError::Configuration(
                "max_tool_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }
}

/// Builder for AgentConfig.
#[derive(Default)]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    /// Set the application name.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = app_name.into();
        self
    }

    /// Set the model string.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    /// Set the full LLM configuration.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    /// Set the agent instruction.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.agent.instruction = instruction.into();
        self
    }

    /// Set the tool round limit.
    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.config.max_tool_rounds = rounds;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AgentConfig {
        self.config
    }
}
