//! `create_reminder`: hands a reminder off to the external reminder service.
//!
//! The tool POSTs `{"username": ..., "description": ...}` as JSON to the configured endpoint.
//! A 2xx response body is returned to the model verbatim; anything else becomes a failed
//! [`ToolResult`] so the model can tell the user the reminder was not set.

use crate::carebot::clients::common::shared_http_client;
use crate::carebot::tool_protocol::{
    ToolError, ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult,
};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::error::Error;
use std::time::Duration;

pub const REMINDER_TOOL_NAME: &str = "create_reminder";

/// HTTP client for the reminder service, exposed as a single-tool protocol.
#[derive(Clone)]
pub struct ReminderTool {
    client: reqwest::Client,
    endpoint: Option<String>,
    timeout: Duration,
}

impl ReminderTool {
    /// `endpoint` is the full reminder URL; `None` makes every call fail with a
    /// configuration error instead of refusing to build the agent.
    pub fn new(endpoint: Option<String>) -> Self {
        ReminderTool {
            client: shared_http_client(),
            endpoint,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn metadata() -> ToolMetadata {
        ToolMetadata::new(
            REMINDER_TOOL_NAME,
            "set reminder with name and description provided",
        )
        .with_parameter(
            ToolParameter::new("username", ToolParameterType::String)
                .with_description("Who the reminder is for")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("description", ToolParameterType::String)
                .with_description("What to remind the user about, including the time")
                .required(),
        )
    }

    /// Create one reminder; transport and HTTP failures come back as a failed result.
    pub async fn create(&self, username: &str, description: &str) -> ToolResult {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint,
            None => return ToolResult::failure("reminder endpoint is not configured".into()),
        };

        log::debug!("creating reminder for '{}' at {}", username, endpoint);
        let payload = json!({
            "username": username,
            "description": description,
        });

        let response = match self
            .client
            .post(endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                log::warn!("reminder service unreachable: {}", err);
                return ToolResult::failure(format!("reminder service unreachable: {}", err));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return ToolResult::failure(format!("could not read reminder response: {}", err))
            }
        };

        if status.is_success() {
            ToolResult::success(JsonValue::String(body))
                .with_metadata("status", json!(status.as_u16()))
        } else {
            log::warn!("reminder service answered {}: {}", status, body);
            ToolResult::failure(format!(
                "reminder service returned {}: {}",
                status.as_u16(),
                body
            ))
            .with_metadata("status", json!(status.as_u16()))
        }
    }
}

#[async_trait]
impl ToolProtocol for ReminderTool {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != REMINDER_TOOL_NAME {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }
        let username = parameters["username"].as_str().ok_or_else(|| {
            ToolError::InvalidParameters("'username' must be a string".to_string())
        })?;
        let description = parameters["description"].as_str().ok_or_else(|| {
            ToolError::InvalidParameters("'description' must be a string".to_string())
        })?;

        Ok(self.create(username, description).await)
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![Self::metadata()])
    }

    async fn get_tool_metadata(
        &self,
        tool_name: &str,
    ) -> Result<ToolMetadata, Box<dyn Error + Send + Sync>> {
        if tool_name == REMINDER_TOOL_NAME {
            Ok(Self::metadata())
        } else {
            Err(Box::new(ToolError::NotFound(tool_name.to_string())))
        }
    }

    fn protocol_name(&self) -> &str {
        "reminder"
    }
}
