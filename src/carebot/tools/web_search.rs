//! `tavily_search`: web search through the Tavily API.
//!
//! Requests go to `{base_url}/search` with a bearer API key. Only `title`, `url` and
//! `content` of each hit are handed back to the model, and never more than `max_results`
//! of them even when the service returns extra.

use crate::carebot::clients::common::{normalize_base_url, shared_http_client};
use crate::carebot::tool_protocol::{
    ToolError, ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::error::Error;
use std::time::Duration;

pub const SEARCH_TOOL_NAME: &str = "tavily_search";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// One search hit as returned to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct TavilySearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
    timeout: Duration,
}

impl TavilySearchTool {
    pub fn new(api_key: Option<String>, max_results: usize) -> Self {
        TavilySearchTool {
            client: shared_http_client(),
            base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            api_key,
            max_results,
            timeout: Duration::from_secs(30),
        }
    }

    /// Point the tool at a different deployment (or a local stand-in).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn metadata() -> ToolMetadata {
        ToolMetadata::new(
            SEARCH_TOOL_NAME,
            "A search engine optimized for comprehensive, accurate, and trusted results. \
             Useful for when you need to answer questions about current events or medical \
             information. Input should be a search query.",
        )
        .with_parameter(
            ToolParameter::new("query", ToolParameterType::String)
                .with_description("Search query to look up")
                .required(),
        )
    }

    pub async fn search(&self, query: &str) -> ToolResult {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => return ToolResult::failure("search API key is not configured".into()),
        };

        let url = format!("{}/search", self.base_url);
        log::debug!("searching '{}' (max {} results)", query, self.max_results);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&json!({
                "query": query,
                "max_results": self.max_results,
            }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                log::warn!("search service unreachable: {}", err);
                return ToolResult::failure(format!("search service unreachable: {}", err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("search service answered {}: {}", status, body);
            return ToolResult::failure(format!(
                "search service returned {}: {}",
                status.as_u16(),
                body
            ));
        }

        match response.json::<SearchResponse>().await {
            Ok(parsed) => {
                let hits: Vec<SearchHit> =
                    parsed.results.into_iter().take(self.max_results).collect();
                let count = hits.len();
                ToolResult::success(json!({ "query": query, "results": hits }))
                    .with_metadata("result_count", json!(count))
            }
            Err(err) => ToolResult::failure(format!("malformed search response: {}", err)),
        }
    }
}

#[async_trait]
impl ToolProtocol for TavilySearchTool {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: JsonValue,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != SEARCH_TOOL_NAME {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }
        let query = parameters["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidParameters("'query' must be a string".to_string()))?;

        Ok(self.search(query).await)
    }

    async fn list_tools(&self) -> Result<Vec<ToolMetadata>, Box<dyn Error + Send + Sync>> {
        Ok(vec![Self::metadata()])
    }

    async fn get_tool_metadata(
        &self,
        tool_name: &str,
    ) -> Result<ToolMetadata, Box<dyn Error + Send + Sync>> {
        if tool_name == SEARCH_TOOL_NAME {
            Ok(Self::metadata())
        } else {
            Err(Box::new(ToolError::NotFound(tool_name.to_string())))
        }
    }

    fn protocol_name(&self) -> &str {
        "tavily"
    }
}
