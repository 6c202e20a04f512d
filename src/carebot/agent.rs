//! Agent profiles
//!
//! An [`Agent`] binds one [`AgentKind`] to everything the engine needs to run a request for
//! it: the fixed system prompt, the model client (already configured with the kind's model
//! and temperature), and the [`ToolRegistry`] whose declarations go out with every model call.
//!
//! Two profiles ship with the crate:
//!
//! - **chat**: medical assistant restricted to health topics, with web search and reminders
//! - **symptom_checker**: general personal assistant with web search
//!
//! # Example
//!
//! ```rust,no_run
//! use carebot::{Agent, AgentKind, CarebotConfig};
//! use carebot::clients::openai::OpenAIClient;
//! use std::sync::Arc;
//!
//! # async {
//! let config = CarebotConfig::default();
//! let client = Arc::new(OpenAIClient::new("key", "gpt-4o").with_temperature(0.1));
//! let agent = Agent::chat_assistant(&config, client).await.unwrap();
//! assert_eq!(agent.kind(), AgentKind::Chat);
//! # };
//! ```

use crate::carebot::client_wrapper::{ClientWrapper, ToolDefinition};
use crate::carebot::clients::openai::OpenAIClient;
use crate::carebot::config::{CarebotConfig, ModelSettings};
use crate::carebot::session_store::AgentKind;
use crate::carebot::tool_protocol::{ToolProtocol, ToolRegistry};
use crate::carebot::tools::{ReminderTool, TavilySearchTool};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub const CHAT_SYSTEM_PROMPT: &str = "\
You are a professional medical assistant. Your role is to help users with medical, health, and wellness-related questions only.

Guidelines:
- If you are asked about yourself, respond with: \"I'm a virtual medical assistant here to help you with health-related questions.\"
- Respond ONLY to medical or health-related queries.
- For any non-medical topic (e.g., finance, technology, legal, personal), reply: \"Sorry, I'm only able to assist with medical and health-related queries.\"
- Use the available tools whenever they are relevant to the user's request.

Available tools:
1. Tool: `tavily_search`
   Use when the user describes symptoms or asks about possible causes of health conditions.

2. Tool: `create_reminder`
   Use to set reminders for medication, appointments, or health checkups when the user requests it.

Additional instructions:
- Do not provide advice or answers outside the medical domain.
- Always prefer using a tool if it matches the user's request.
- Maintain a professional, respectful, and medically accurate tone.
- If a request is unclear or requires a licensed professional, state that you cannot assist further.
- Never engage in non-medical conversations.

Your primary goal is to provide accurate, helpful, and safe support within the medical domain.
";

pub const SYMPTOM_CHECKER_SYSTEM_PROMPT: &str = "you are personal assistant";

/// Refusal the chat profile is instructed to give for out-of-scope questions.
pub const OUT_OF_SCOPE_REPLY: &str =
    "Sorry, I'm only able to assist with medical and health-related queries.";

pub struct Agent {
    kind: AgentKind,
    system_prompt: String,
    client: Arc<dyn ClientWrapper>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    /// An agent with no tools.
    pub fn new(
        kind: AgentKind,
        system_prompt: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        Self {
            kind,
            system_prompt: system_prompt.into(),
            client,
            tools: Arc::new(ToolRegistry::empty()),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Medical assistant: `tavily_search` + `create_reminder`.
    pub async fn chat_assistant(
        config: &CarebotConfig,
        client: Arc<dyn ClientWrapper>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let search: Arc<dyn ToolProtocol> = Arc::new(search_tool(config));
        let reminder: Arc<dyn ToolProtocol> = Arc::new(reminder_tool(config));
        let registry = registry_from(vec![search, reminder]).await?;
        Ok(Self::new(AgentKind::Chat, CHAT_SYSTEM_PROMPT, client).with_tools(Arc::new(registry)))
    }

    /// Personal assistant: `tavily_search` only.
    pub async fn symptom_checker(
        config: &CarebotConfig,
        client: Arc<dyn ClientWrapper>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let search: Arc<dyn ToolProtocol> = Arc::new(search_tool(config));
        let registry = registry_from(vec![search]).await?;
        Ok(
            Self::new(AgentKind::SymptomChecker, SYMPTOM_CHECKER_SYSTEM_PROMPT, client)
                .with_tools(Arc::new(registry)),
        )
    }

    /// Both profiles backed by OpenAI clients built from `config`.
    pub async fn default_agents(
        config: &CarebotConfig,
    ) -> Result<Vec<Self>, Box<dyn Error + Send + Sync>> {
        let chat = Self::chat_assistant(config, openai_client(config, &config.chat_model)).await?;
        let symptom =
            Self::symptom_checker(config, openai_client(config, &config.symptom_model)).await?;
        Ok(vec![chat, symptom])
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }
}

fn openai_client(config: &CarebotConfig, settings: &ModelSettings) -> Arc<dyn ClientWrapper> {
    Arc::new(
        OpenAIClient::new_with_base_url(
            &config.openai_api_key,
            &settings.model,
            &config.openai_base_url,
        )
        .with_temperature(settings.temperature),
    )
}

fn search_tool(config: &CarebotConfig) -> TavilySearchTool {
    TavilySearchTool::new(config.tavily_api_key.clone(), config.search_max_results)
        .with_base_url(&config.tavily_base_url)
        .with_timeout(Duration::from_secs(config.tool_timeout_secs))
}

fn reminder_tool(config: &CarebotConfig) -> ReminderTool {
    ReminderTool::new(config.reminder_url.clone())
        .with_timeout(Duration::from_secs(config.tool_timeout_secs))
}

async fn registry_from(
    protocols: Vec<Arc<dyn ToolProtocol>>,
) -> Result<ToolRegistry, Box<dyn Error + Send + Sync>> {
    let mut registry = ToolRegistry::empty();
    for protocol in protocols {
        registry.add_protocol(protocol).await?;
    }
    Ok(registry)
}
