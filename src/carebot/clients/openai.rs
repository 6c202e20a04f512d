//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat Completions API
//! (or any compatible deployment), including native tool calling.
//!
//! # Key Features
//!
//! - **send_message(...)**: serializes the history plus tool declarations, returns an
//!   [`AssistantReply`] whose variant says whether tools were requested.
//! - **Automatic Usage Capture**: stores the latest `TokenUsage` internally.
//! - **Inspect Usage**: call `get_last_usage()` after `send_message()`.
//!
//! # Example
//!
//! ```rust,no_run
//! use carebot::clients::openai::OpenAIClient;
//! use carebot::client_wrapper::{ClientWrapper, Turn};
//!
//! # async {
//! let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
//! let client = OpenAIClient::new(&key, "gpt-4o").with_temperature(0.1);
//! let reply = client
//!     .send_message(&[Turn::system("You are an assistant."), Turn::user("Hello!")], &[])
//!     .await;
//! # };
//! ```

use crate::carebot::client_wrapper::{
    AssistantReply, ClientWrapper, ModelError, Role, TokenUsage, ToolCall, ToolDefinition, Turn,
};
use crate::carebot::clients::common::{normalize_base_url, shared_http_client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Client wrapper for OpenAI's Chat Completions API.
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    pub fn new(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_OPENAI_BASE_URL)
    }

    /// Target an OpenAI-compatible deployment at `base_url` (the part before
    /// `/chat/completions`).
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        OpenAIClient {
            client: shared_http_client(),
            base_url: normalize_base_url(base_url),
            api_key: secret_key.to_string(),
            model: model_name.to_string(),
            temperature: None,
            timeout: Duration::from_secs(300),
            token_usage: Mutex::new(None),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    fn request_body(&self, turns: &[Turn], tools: &[ToolDefinition]) -> JsonValue {
        let messages: Vec<JsonValue> = turns.iter().map(turn_to_wire).collect();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if !tools.is_empty() {
            body["tools"] = JsonValue::Array(
                tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters_schema,
                            }
                        })
                    })
                    .collect(),
            );
        }
        body
    }
}

fn turn_to_wire(turn: &Turn) -> JsonValue {
    let mut message = json!({
        "role": turn.role.as_str(),
        "content": turn.content,
    });
    match turn.role {
        Role::Assistant if !turn.tool_calls.is_empty() => {
            if turn.content.is_empty() {
                message["content"] = JsonValue::Null;
            }
            message["tool_calls"] = JsonValue::Array(
                turn.tool_calls
                    .iter()
                    .map(|call| {
                        let arguments = match &call.arguments {
                            JsonValue::String(raw) => raw.clone(),
                            other => other.to_string(),
                        };
                        json!({
                            "id": call.call_id,
                            "type": "function",
                            "function": {"name": call.tool_name, "arguments": arguments},
                        })
                    })
                    .collect(),
            );
        }
        Role::Tool => {
            message["tool_call_id"] = json!(turn.tool_call_id.as_deref().unwrap_or_default());
        }
        _ => {}
    }
    message
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize, Serialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize, Serialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

fn parse_tool_call(wire: WireToolCall) -> ToolCall {
    let arguments = if wire.function.arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&wire.function.arguments)
            .unwrap_or(JsonValue::String(wire.function.arguments))
    };
    let call_id = wire
        .id
        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
    ToolCall::new(call_id, wire.function.name, arguments)
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(turns, tools);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                log::error!("carebot::clients::openai: transport error: {}", err);
                ModelError::new(format!("request to {} failed: {}", url, err))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!(
                "carebot::clients::openai: API returned {}: {}",
                status,
                text
            );
            return Err(ModelError::new(format!(
                "provider returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|err| ModelError::new(format!("malformed completion: {}", err)))?;

        if let Some(usage) = completion.usage {
            *self.token_usage.lock().await = Some(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ModelError::new("completion contained no choices"))?;

        let calls = message.tool_calls.into_iter().map(parse_tool_call).collect();
        Ok(AssistantReply::from_parts(
            message.content.unwrap_or_default(),
            calls,
        ))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
