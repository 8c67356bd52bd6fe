//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com as well as local servers that mimic it
//! (vLLM, llama.cpp server, LM Studio). The API key is optional for the
//! latter.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use quire_core::error::{QuireError, QuireResult};
use quire_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage, Tool, ToolCall, ToolChoice,
};
use quire_core::types::{Message, MessageRole};

use crate::ollama::normalize_base_url;
use crate::tools::{function_tools, FunctionTool};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatibleLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
    api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunction {
    name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

impl OpenAiCompatibleLlm {
    /// Create a new provider. The key comes from the config or `OPENAI_API_KEY`.
    pub fn new(config: LlmConfig) -> QuireResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_API_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        if api_key.is_none() && base_url == OPENAI_API_URL {
            return Err(QuireError::Configuration(
                "OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string(),
            ));
        }

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
            api_key,
        })
    }

    fn message_to_openai(msg: &Message) -> OpenAiMessage {
        let tool_calls: Vec<OpenAiToolCall> = msg
            .tool_calls
            .iter()
            .enumerate()
            .map(|(i, call)| OpenAiToolCall {
                id: Some(call.id.clone().unwrap_or_else(|| format!("call_{}", i))),
                kind: function_kind(),
                function: OpenAiFunction {
                    name: call.name.clone(),
                    arguments: serde_json::to_string(&call.arguments)
                        .unwrap_or_else(|_| "{}".to_string()),
                },
            })
            .collect();

        // Assistant turns that only call tools carry no content.
        let content = if msg.content.is_empty() && !tool_calls.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };

        OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content,
            tool_calls,
            tool_call_id: match msg.role {
                MessageRole::Tool => msg.tool_call_id.clone(),
                _ => None,
            },
            name: match msg.role {
                MessageRole::Tool => None,
                _ => msg.name.clone(),
            },
        }
    }

    fn build_request<'a>(
        &'a self,
        messages: &[Message],
        tools: &'a [Tool],
        tool_choice: ToolChoice,
        options: GenerationOptions,
    ) -> ChatCompletionRequest<'a> {
        let tools = function_tools(tools);
        let tool_choice = if tools.is_empty() {
            None
        } else {
            Some(match tool_choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
                ToolChoice::Required => "required",
            })
        };

        ChatCompletionRequest {
            model: &self.config.model,
            messages: messages.iter().map(Self::message_to_openai).collect(),
            temperature: options.temperature.unwrap_or(self.config.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            top_p: options.top_p,
            tools,
            tool_choice,
        }
    }

    async fn complete(&self, request: &ChatCompletionRequest<'_>) -> QuireResult<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.config.model, tools = request.tools.len(), "Chat completion request");

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, url = %url, "Chat completion request failed");
            QuireError::network(format!("Chat completion request failed: {}", e))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuireError::llm(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(QuireError::from_http_status(status.as_u16(), &message));
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> QuireResult<LlmResponse> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| QuireError::llm_invalid_response(format!("Failed to parse response: {}", e)))?;

    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| QuireError::llm_invalid_response("Response has no choices"))?;

    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = if call.function.arguments.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    QuireError::llm_invalid_response(format!(
                        "Tool call '{}' has invalid arguments: {}",
                        call.function.name, e
                    ))
                })?
            };
            Ok(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            })
        })
        .collect::<QuireResult<Vec<_>>>()?;

    Ok(LlmResponse {
        content: message.content.filter(|c| !c.is_empty()),
        tool_calls,
        usage,
    })
}

#[async_trait]
impl Llm for OpenAiCompatibleLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> QuireResult<LlmResponse> {
        let request =
            self.build_request(messages, &[], ToolChoice::Auto, options.unwrap_or_default());
        self.complete(&request).await
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
        self.complete(&request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local() -> OpenAiCompatibleLlm {
        OpenAiCompatibleLlm::new(LlmConfig {
            model: "qwen2.5-7b-instruct".to_string(),
            base_url: Some("http://localhost:8000/v1".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_shape_with_tools() {
        let llm = local();
        let tools = vec![Tool::new("check_uploaded_document", "Inspect", json!({"type": "object"}))];
        let request = llm.build_request(
            &[Message::user("hi")],
            &tools,
            ToolChoice::Auto,
            GenerationOptions::default(),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "qwen2.5-7b-instruct");
        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert_eq!(value["max_tokens"], 1024);
    }

    #[test]
    fn test_tool_round_trip_messages() {
        let call = ToolCall {
            id: Some("call_abc".to_string()),
            name: "check_uploaded_document".to_string(),
            arguments: HashMap::new(),
        };
        let assistant = OpenAiCompatibleLlm::message_to_openai(&Message::assistant_tool_calls(
            "",
            vec![call.clone()],
        ));
        assert!(assistant.content.is_none());
        assert_eq!(assistant.tool_calls[0].function.arguments, "{}");

        let tool = OpenAiCompatibleLlm::message_to_openai(&Message::tool_result(&call, "done"));
        assert_eq!(tool.role, "tool");
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_abc"));
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body = r#"{
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "check_uploaded_document", "arguments": "{\"verbose\": true}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25}
        }"#;
        let response = parse_response(body).unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(response.tool_calls[0].arguments["verbose"], json!(true));
        assert_eq!(response.usage.unwrap().total_tokens, 25);
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "tool_calls": [
            {"id": "c", "type": "function", "function": {"name": "x", "arguments": "{oops"}}
        ]}}]}"#;
        assert!(parse_response(body).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_choices() {
        let err = parse_response(r#"{"choices": []}"#).unwrap_err();
        assert_eq!(err.code(), quire_core::ErrorCode::LlmInvalidResponse);
    }
}
