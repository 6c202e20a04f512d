//! # carebot
//!
//! carebot is the backend of a conversational medical assistant. It routes each user message
//! through a language-model-driven loop that may call external tools (web search, reminder
//! creation) before replying, and it keeps every user's conversation durable across requests
//! and restarts.
//!
//! The crate is layered leaf-first:
//!
//! * **History**: [`history::ConversationHistory`], the ordered turn log of one session, with
//!   the ordering and tool-linkage invariants checked on load
//! * **Session Store**: [`SessionStore`] with a file-backed [`FileSessionStore`] (atomic
//!   writes, one document per `(user_id, agent_kind)`) and an [`InMemorySessionStore`]
//! * **Tools**: [`tool_protocol::ToolRegistry`] over [`tool_protocol::ToolProtocol`]
//!   implementations; the built-in [`tools`] cover Tavily search and the reminder service
//! * **Router**: [`router::decide`], a pure function from the latest reply to the next step
//! * **Engine**: [`ConversationEngine`], which locks a session, runs the bounded
//!   model → tools loop, and saves the result
//! * **Provider**: [`ClientWrapper`] with an OpenAI-compatible
//!   [`clients::openai::OpenAIClient`] that speaks native tool calling
//!
//! With the `http-server` feature, `server` exposes the engine over HTTP and the
//! `carebot-server` binary wires everything from environment configuration.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use carebot::{Agent, CarebotConfig, ConversationEngine, FileSessionStore};
//! use carebot::session_store::{AgentKind, SessionKey};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     carebot::init_logger();
//!
//!     let config = CarebotConfig::from_env()?;
//!     let mut engine = ConversationEngine::new(Arc::new(FileSessionStore::new(&config.session_dir)))
//!         .with_max_cycles(config.max_cycles);
//!     for agent in Agent::default_agents(&config).await? {
//!         engine.register_agent(agent);
//!     }
//!
//!     let key = SessionKey::new("7", AgentKind::Chat);
//!     let reply = engine.process(&key, "remind me to take medicine at 9pm").await?;
//!     println!("AI: {}", reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Tools
//!
//! Any Rust closure can become a tool through [`tool_protocols::CustomToolProtocol`]:
//!
//! ```rust,no_run
//! use carebot::tool_protocol::{ToolMetadata, ToolRegistry, ToolResult};
//! use carebot::tool_protocols::CustomToolProtocol;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let protocol = Arc::new(CustomToolProtocol::new());
//! protocol
//!     .register_tool(
//!         ToolMetadata::new("clinic_hours", "Opening hours of the clinic"),
//!         Arc::new(|_| Ok(ToolResult::success(serde_json::json!("Mon-Fri 8:00-18:00")))),
//!     )
//!     .await;
//!
//! let mut registry = ToolRegistry::empty();
//! registry.add_protocol(protocol).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// ```rust
/// carebot::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

pub mod carebot;

pub use carebot::agent;
pub use carebot::agent::Agent;
pub use carebot::client_wrapper;
pub use carebot::client_wrapper::{AssistantReply, ClientWrapper, Role, ToolCall, Turn};
pub use carebot::clients;
pub use carebot::config;
pub use carebot::config::{CarebotConfig, ConfigError, ModelSettings};
pub use carebot::engine;
pub use carebot::engine::{ConversationEngine, EngineError};
pub use carebot::event;
pub use carebot::event::{EngineEvent, EventHandler};
pub use carebot::history;
pub use carebot::router;
pub use carebot::session_store;
pub use carebot::session_store::{
    AgentKind, FileSessionStore, InMemorySessionStore, SessionKey, SessionStore, StorageError,
};
pub use carebot::tool_protocol;
pub use carebot::tool_protocols;
pub use carebot::tools;

#[cfg(feature = "http-server")]
pub use carebot::server;
