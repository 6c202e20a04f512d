//! Tool Protocol Abstraction Layer
//!
//! This module provides the abstraction the conversation engine uses to reach external
//! capabilities (web search, reminder creation, or anything else an agent exposes).
//!
//! # Architecture
//!
//! ```text
//! ConversationEngine → ToolRegistry → Tool → ToolProtocol (trait) → [Reminder | Search | Custom]
//! ```
//!
//! The registry also renders its tools into the JSON-schema declarations the model uses for
//! tool selection, and validates the model's arguments against the declared parameters before
//! anything is executed.
//!
//! # Example
//!
//! ```rust,no_run
//! use carebot::tool_protocol::{ToolParameter, ToolParameterType};
//!
//! // Define a tool parameter
//! let param = ToolParameter::new("description", ToolParameterType::String)
//!     .with_description("What the reminder is about")
//!     .required();
//! ```

use crate::carebot::client_wrapper::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Represents the result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool execution was successful
    pub success: bool,
    /// The output data from the tool
    pub output: serde_json::Value,
    /// Optional error message if execution failed
    pub error: Option<String>,
    /// Metadata about the execution (timing, status codes, etc.)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolResult {
    /// Convenience constructor for successful tool execution.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Convenience constructor for failed tool execution.
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error),
            metadata: HashMap::new(),
        }
    }

    /// Attach application specific metadata to the result.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Text handed back to the model as the tool-result turn content.
    ///
    /// String outputs are passed through verbatim; structured outputs are serialized as JSON.
    pub fn to_content(&self) -> String {
        if self.success {
            match &self.output {
                serde_json::Value::String(text) => text.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            }
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("tool failed without a message")
            )
        }
    }
}

/// Defines the type of a tool parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ToolParameterType {
    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ToolParameterType::String => value.is_string(),
            ToolParameterType::Number => value.is_number(),
            ToolParameterType::Integer => value.is_i64() || value.is_u64(),
            ToolParameterType::Boolean => value.is_boolean(),
            ToolParameterType::Array => value.is_array(),
            ToolParameterType::Object => value.is_object(),
        }
    }
}

/// Defines a parameter for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<serde_json::Value>,
}

impl ToolParameter {
    /// Define a new tool parameter with the provided name and type.
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
            default: None,
        }
    }

    /// Add a human readable description that will surface in generated schemas.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Provide a default value that will be used when the model omits the parameter.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Metadata about a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// Create metadata with the supplied identifier and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter definition to the tool metadata.
    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Render the parameters as a JSON-schema object.
    pub fn json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut property = serde_json::json!({
                "type": param.param_type,
                "description": param.description.as_deref().unwrap_or("")
            });
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            properties.insert(param.name.clone(), property);

            if param.required {
                required.push(param.name.clone());
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Declaration handed to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters_schema: self.json_schema(),
        }
    }

    /// Check `arguments` against the declared parameters and fill in defaults.
    ///
    /// Unknown keys are tolerated; missing required keys and type mismatches are not.
    pub fn validate_arguments(
        &self,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let mut object = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null if self.parameters.iter().all(|p| !p.required) => {
                serde_json::Map::new()
            }
            serde_json::Value::String(raw) => {
                return Err(ToolError::InvalidParameters(format!(
                    "arguments for '{}' are not a JSON object: {}",
                    self.name, raw
                )))
            }
            other => {
                return Err(ToolError::InvalidParameters(format!(
                    "arguments for '{}' must be a JSON object, got {}",
                    self.name, other
                )))
            }
        };

        for param in &self.parameters {
            match object.get(&param.name) {
                Some(value) if !param.param_type.matches(value) => {
                    return Err(ToolError::InvalidParameters(format!(
                        "parameter '{}' must be of type {:?}",
                        param.name, param.param_type
                    )));
                }
                Some(_) => {}
                None => {
                    if let Some(default) = &param.default {
                        object.insert(param.name.clone(), default.clone());
                    } else if param.required {
                        return Err(ToolError::InvalidParameters(format!(
                            "missing required parameter '{}'",
                            param.name
                        )));
                    }
                }
            }
        }

        Ok(serde_json::Value::Object(object))
    }
}

/// Trait for implementing tool execution protocols
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    /// Execute a tool with the given parameters
    async fn execute(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>>;

    /// Get metadata about available tools
    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>>;

    /// Get metadata about a specific tool
    async fn get_tool_metadata(
        &self,
        tool_name: &str,
    ) -> Result<ToolMetadata, Box<dyn Error + Send + Sync>>;

    /// Protocol identifier (e.g., "reminder", "tavily", "custom")
    fn protocol_name(&self) -> &str;
}

/// Error types for tool operations
#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Requested tool is not registered in the current registry/protocol.
    NotFound(String),
    /// Tool execution completed with an application level failure.
    ExecutionFailed(String),
    /// The provided JSON parameters failed validation or deserialization.
    InvalidParameters(String),
    /// A lower level protocol/transport error occurred.
    ProtocolError(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "Tool not found: {}", name),
            ToolError::ExecutionFailed(msg) => write!(f, "Tool execution failed: {}", msg),
            ToolError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            ToolError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl Error for ToolError {}

/// A tool that can be used by agents
pub struct Tool {
    /// Metadata describing the tool interface.
    metadata: ToolMetadata,
    /// Underlying protocol implementation that actually executes the tool.
    protocol: Arc<dyn ToolProtocol>,
}

impl Tool {
    /// Create a tool from existing metadata bound to the supplied protocol implementation.
    pub fn new(metadata: ToolMetadata, protocol: Arc<dyn ToolProtocol>) -> Self {
        Self { metadata, protocol }
    }

    /// Borrow the static metadata for the tool.
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Execute the tool using the configured protocol.
    pub async fn execute(
        &self,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        self.protocol.execute(&self.metadata.name, parameters).await
    }
}

/// Registry for managing tools available to an agent.
///
/// Tools keep their registration order, which is also the order of the declarations sent to
/// the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Build a registry with no tools.
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Insert or replace a tool definition.
    pub fn add_tool(&mut self, tool: Tool) {
        match self
            .tools
            .iter_mut()
            .find(|t| t.metadata.name == tool.metadata.name)
        {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Register every tool a protocol advertises.
    pub async fn add_protocol(
        &mut self,
        protocol: Arc<dyn ToolProtocol>,
    ) -> Result<usize, Box<dyn Error + Send + Sync>> {
        let advertised = protocol.list_tools().await?;
        let count = advertised.len();
        for metadata in advertised {
            log::debug!(
                "registering tool '{}' from protocol '{}'",
                metadata.name,
                protocol.protocol_name()
            );
            self.add_tool(Tool::new(metadata, protocol.clone()));
        }
        Ok(count)
    }

    /// Remove a tool by name returning the owned entry if present.
    pub fn remove_tool(&mut self, name: &str) -> Option<Tool> {
        let index = self.tools.iter().position(|t| t.metadata.name == name)?;
        Some(self.tools.remove(index))
    }

    /// Borrow a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.metadata.name == name)
    }

    /// List metadata for registered tools in registration order.
    pub fn list_tools(&self) -> Vec<&ToolMetadata> {
        self.tools.iter().map(|t| &t.metadata).collect()
    }

    /// Declarations for the model-call capability.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.metadata.to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments and execute a named tool.
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        let tool = self
            .get_tool(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        let parameters = tool.metadata.validate_arguments(parameters)?;

        tool.execute(parameters).await
    }
}
