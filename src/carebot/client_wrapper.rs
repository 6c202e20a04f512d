//! A ClientWrapper is a wrapper around a specific LLM chat service.
//!
//! It provides a common interface to ask a model for the next assistant turn given the
//! ordered conversation so far and the tools the current agent exposes. It does not keep
//! track of the conversation itself; that is the job of the
//! [`ConversationEngine`](crate::engine::ConversationEngine), which loads and saves
//! histories through a [`SessionStore`](crate::session_store::SessionStore).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tokio::sync::Mutex;

/// Represents the possible roles for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    // set by the developer to steer the model's responses
    System,
    // a message sent by a human user (or app user)
    User,
    // generated by the model, possibly requesting tool calls
    Assistant,
    // the outcome of one tool call, linked back through `tool_call_id`
    Tool,
}

impl Role {
    /// Wire name used by OpenAI-compatible chat APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A structured request, emitted by the model, to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned identifier; tool-result turns point back at it.
    pub call_id: String,
    /// Name of the tool to execute (e.g. `"create_reminder"`).
    pub tool_name: String,
    /// Raw JSON arguments. Arguments the provider could not decode are kept as a JSON string
    /// so the registry can report them back to the model as invalid.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// One entry in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// The role associated with the turn.
    pub role: Role,
    /// Text content. May be empty for assistant turns that only carry tool calls.
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by an assistant turn, in emission order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set only on tool-result turns: the `call_id` this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// An assistant turn that requests the given tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// A tool-result turn answering the call identified by `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// The next assistant turn as produced by the model.
///
/// Whether the model asked for tools is carried by the variant itself, so routing is a
/// pattern match rather than a probe for optional fields.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    /// A final answer with no tool requests.
    Plain(String),
    /// Text (often empty) plus one or more tool calls to run before the next model call.
    WithToolCalls(String, Vec<ToolCall>),
}

impl AssistantReply {
    /// Build a reply from provider output, collapsing an empty call list into [`Plain`](Self::Plain).
    pub fn from_parts(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        if calls.is_empty() {
            AssistantReply::Plain(content.into())
        } else {
            AssistantReply::WithToolCalls(content.into(), calls)
        }
    }

    pub fn content(&self) -> &str {
        match self {
            AssistantReply::Plain(content) | AssistantReply::WithToolCalls(content, _) => content,
        }
    }

    /// The assistant turn to record in history for this reply.
    pub fn to_turn(&self) -> Turn {
        match self {
            AssistantReply::Plain(content) => Turn::assistant(content.clone()),
            AssistantReply::WithToolCalls(content, calls) => {
                Turn::assistant_with_tool_calls(content.clone(), calls.clone())
            }
        }
    }
}

/// A tool declaration handed to the model for tool selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters_schema: serde_json::Value,
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Error raised when the model capability cannot produce a reply.
#[derive(Debug, Clone)]
pub struct ModelError {
    message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        ModelError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model call failed: {}", self.message)
    }
}

impl Error for ModelError {}

/// Trait defining the interface to interact with various LLM services.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Identifier of the model this client talks to.
    fn model_name(&self) -> &str;

    /// Ask the model for the next assistant turn.
    /// - `turns`: the full ordered history, system turn first.
    /// - `tools`: declarations of the tools the current agent exposes (may be empty).
    async fn send_message(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, ModelError>;

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl reads [`usage_slot`](ClientWrapper::usage_slot).
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        match self.usage_slot() {
            Some(slot) => slot.lock().await.clone(),
            None => None,
        }
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Clients supporting TokenUsage tracking override this.
        None
    }
}
