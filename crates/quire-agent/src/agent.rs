//! Agent definition: identity, instruction, model and tools.

use std::sync::Arc;

use quire_core::config::AgentConfig;
use quire_core::error::{QuireError, QuireResult};
use quire_core::traits::{GenerationOptions, Llm, Tool};

use crate::document::DocumentTool;
use crate::tool::FunctionTool;

/// A model plus the instruction and tools it works with.
pub struct Agent {
    name: String,
    description: String,
    instruction: String,
    llm: Arc<dyn Llm>,
    tools: Vec<Arc<dyn FunctionTool>>,
    generation: GenerationOptions,
}

impl Agent {
    /// Start building an agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn llm(&self) -> &Arc<dyn Llm> {
        &self.llm
    }

    pub fn tools(&self) -> &[Arc<dyn FunctionTool>] {
        &self.tools
    }

    /// Generation options applied to every model call.
    pub fn generation(&self) -> &GenerationOptions {
        &self.generation
    }

    /// Find a registered tool by name.
    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn FunctionTool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Declarations of every registered tool.
    pub fn declarations(&self) -> Vec<Tool> {
        self.tools.iter().map(|tool| tool.declaration()).collect()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.llm.model_name())
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Agent`].
#[derive(Default)]
pub struct AgentBuilder {
    name: Option<String>,
    description: String,
    instruction: String,
    llm: Option<Arc<dyn Llm>>,
    tools: Vec<Arc<dyn FunctionTool>>,
    generation: GenerationOptions,
}

impl AgentBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System instruction given to the model.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Register a tool.
    pub fn tool(mut self, tool: Arc<dyn FunctionTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.generation = options;
        self
    }

    /// Build the agent. A model is required and tool names must be unique.
    pub fn build(self) -> QuireResult<Agent> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| QuireError::validation("agent name is required"))?;
        let llm = self
            .llm
            .ok_or_else(|| QuireError::validation("agent needs a model"))?;

        for (i, tool) in self.tools.iter().enumerate() {
            if self.tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(QuireError::validation(format!(
                    "tool '{}' is registered twice",
                    tool.name()
                )));
            }
        }

        Ok(Agent {
            name,
            description: self.description,
            instruction: self.instruction,
            llm,
            tools: self.tools,
            generation: self.generation,
        })
    }
}

/// Build the document agent: `check_uploaded_document` is its only tool.
pub fn document_agent(config: &AgentConfig, llm: Arc<dyn Llm>) -> QuireResult<Agent> {
    Agent::builder()
        .name(&config.agent.name)
        .description(&config.agent.description)
        .instruction(&config.agent.instruction)
        .llm(llm)
        .tool(Arc::new(DocumentTool::new()))
        .generation(GenerationOptions {
            temperature: Some(config.llm.temperature),
            max_tokens: Some(config.llm.max_tokens),
            top_p: None,
        })
        .build()
}
