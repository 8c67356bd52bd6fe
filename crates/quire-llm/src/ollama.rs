//! Ollama LLM provider implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use quire_core::error::{QuireError, QuireResult};
use quire_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage, Tool, ToolCall, ToolChoice,
};
use quire_core::types::{Message, MessageRole};

use crate::tools::{function_tools, FunctionTool};

/// Default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama LLM provider speaking the native `/api/chat` protocol.
pub struct OllamaLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool<'a>>,
    options: OllamaOptions,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider.
    pub fn new(config: LlmConfig) -> QuireResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                QuireError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn message_to_ollama(msg: &Message) -> OllamaMessage {
        OllamaMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| OllamaToolCall {
                    function: OllamaFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
            tool_name: match msg.role {
                MessageRole::Tool => msg.name.clone(),
                _ => None,
            },
        }
    }

    fn build_request<'a>(
        &'a self,
        messages: &[Message],
        tools: &'a [Tool],
        tool_choice: ToolChoice,
        options: GenerationOptions,
    ) -> ChatRequest<'a> {
        // Ollama has no tool_choice; withholding the tools is the only way to say "none".
        let tools = match tool_choice {
            ToolChoice::None => Vec::new(),
            ToolChoice::Auto | ToolChoice::Required => function_tools(tools),
        };

        ChatRequest {
            model: &self.config.model,
            messages: messages.iter().map(Self::message_to_ollama).collect(),
            stream: false,
            tools,
            options: OllamaOptions {
                temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
                num_predict: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
                top_p: options.top_p,
            },
        }
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> QuireResult<LlmResponse> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %self.config.model, tools = request.tools.len(), "Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %url, "Ollama request failed");
                if e.is_timeout() {
                    QuireError::Network {
                        message: format!("Ollama request timed out: {}", e),
                        code: quire_core::ErrorCode::NetTimeout,
                        source: None,
                    }
                } else {
                    QuireError::network(format!("Ollama API request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuireError::llm(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(QuireError::from_http_status(status.as_u16(), &message));
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> QuireResult<LlmResponse> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| QuireError::llm_invalid_response(format!("Failed to parse response: {}", e)))?;

    let usage = match (response.prompt_eval_count, response.eval_count) {
        (None, None) => None,
        (prompt, completion) => {
            let prompt_tokens = prompt.unwrap_or(0);
            let completion_tokens = completion.unwrap_or(0);
            Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            })
        }
    };

    let Some(message) = response.message else {
        return Ok(LlmResponse {
            content: None,
            tool_calls: vec![],
            usage,
        });
    };

    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall {
            id: None,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();
    let content = Some(message.content).filter(|c| !c.is_empty());

    Ok(LlmResponse {
        content,
        tool_calls,
        usage,
    })
}

pub(crate) fn normalize_base_url(base_url: &str) -> QuireResult<String> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| QuireError::Configuration(format!("Invalid LLM base URL '{}': {}", base_url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(QuireError::Configuration(format!(
            "LLM base URL must be http or https: {}",
            base_url
        )));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

#[async_trait]
impl Llm for OllamaLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> QuireResult<LlmResponse> {
        let request =
            self.build_request(messages, &[], ToolChoice::None, options.unwrap_or_default());
        self.chat(&request).await
    }

    async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: ToolChoice,
        options: Option<GenerationOptions>,
    ) -> QuireResult<LlmResponse> {
        let request =
            self.build_request(messages, tools, tool_choice, options.unwrap_or_default());
        self.chat(&request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
