//! Closure-backed tool protocol.
//!
//! [`CustomToolProtocol`] lets an agent expose plain Rust functions as tools, which is how
//! ad-hoc capabilities and test doubles are wired into a [`ToolRegistry`].
//!
//! ```ignore
//! let protocol = Arc::new(CustomToolProtocol::new());
//! let mut registry = ToolRegistry::empty();
//! registry.add_protocol(protocol).await?;
//! ```
//!
//! [`ToolRegistry`]: crate::tool_protocol::ToolRegistry

use crate::carebot::tool_protocol::{ToolError, ToolMetadata, ToolProtocol, ToolResult};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Type alias for synchronous tool functions exposed via the custom adapter.
pub type ToolFunction =
    Arc<dyn Fn(JsonValue) -> Result<ToolResult, Box<dyn Error + Send + Sync>> + Send + Sync>;

/// Type alias for asynchronous tool functions exposed via the custom adapter.
pub type AsyncToolFunction = Arc<
    dyn Fn(
            JsonValue,
        )
            -> Pin<Box<dyn Future<Output = Result<ToolResult, Box<dyn Error + Send + Sync>>> + Send>>
        + Send
        + Sync,
>;

enum Handler {
    Sync(ToolFunction),
    Async(AsyncToolFunction),
}

/// Custom function-calling tool adapter
///
/// # Example
///
/// ```rust,no_run
/// use carebot::tool_protocols::CustomToolProtocol;
/// use carebot::tool_protocol::{ToolMetadata, ToolParameter, ToolParameterType, ToolResult};
/// use std::sync::Arc;
///
/// # async {
/// let adapter = CustomToolProtocol::new();
/// adapter
///     .register_tool(
///         ToolMetadata::new("bmi", "Body mass index from weight (kg) and height (m)")
///             .with_parameter(ToolParameter::new("weight", ToolParameterType::Number).required())
///             .with_parameter(ToolParameter::new("height", ToolParameterType::Number).required()),
///         Arc::new(|params| {
///             let weight = params["weight"].as_f64().unwrap_or(0.0);
///             let height = params["height"].as_f64().unwrap_or(1.0);
///             Ok(ToolResult::success(serde_json::json!({"bmi": weight / (height * height)})))
///         }),
///     )
///     .await;
/// # };
/// ```
pub struct CustomToolProtocol {
    // Registration order is the order `list_tools` reports.
    tools: RwLock<Vec<ToolMetadata>>,
    handlers: RwLock<HashMap<String, Handler>>,
}

impl CustomToolProtocol {
    /// Create an empty adapter ready to accept new tool registrations.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a synchronous tool function.
    ///
    /// Subsequent calls will overwrite any existing tool with the same name.
    pub async fn register_tool(&self, metadata: ToolMetadata, function: ToolFunction) {
        self.insert(metadata, Handler::Sync(function)).await;
    }

    /// Register an asynchronous tool function.
    pub async fn register_async_tool(&self, metadata: ToolMetadata, function: AsyncToolFunction) {
        self.insert(metadata, Handler::Async(function)).await;
    }

    /// Remove a tool from the adapter.
    pub async fn unregister_tool(&self, name: &str) {
        self.tools.write().await.retain(|m| m.name != name);
        self.handlers.write().await.remove(name);
    }

    async fn insert(&self, metadata: ToolMetadata, handler: Handler) {
        let name = metadata.name.clone();
        {
            let mut tools = self.tools.write().await;
            match tools.iter_mut().find(|m| m.name == name) {
                Some(existing) => *existing = metadata,
                None => tools.push(metadata),
            }
        }
        self.handlers.write().await.insert(name, handler);
    }
}

impl Default for CustomToolProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolProtocol for CustomToolProtocol {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        // Clone the handler out so the lock is not held across the call.
        let handler = {
            let handlers = self.handlers.read().await;
            match handlers.get(tool_name) {
                Some(Handler::Sync(f)) => Handler::Sync(f.clone()),
                Some(Handler::Async(f)) => Handler::Async(f.clone()),
                None => return Err(Box::new(ToolError::NotFound(tool_name.to_string()))),
            }
        };

        match handler {
            Handler::Sync(f) => f(parameters),
            Handler::Async(f) => f(parameters).await,
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(self.tools.read().await.clone())
    }

    async fn get_tool_metadata(
        &self,
        tool_name: &str,
    ) -> Result<ToolMetadata, Box<dyn Error + Send + Sync>> {
        let tools = self.tools.read().await;
        tools
            .iter()
            .find(|m| m.name == tool_name)
            .cloned()
            .ok_or_else(|| {
                Box::new(ToolError::NotFound(tool_name.to_string())) as Box<dyn Error + Send + Sync>
            })
    }

    fn protocol_name(&self) -> &str {
        "custom"
    }
}
