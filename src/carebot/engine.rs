//! Conversation Engine
//!
//! [`ConversationEngine::process`] takes one user message for one [`SessionKey`] and drives
//! the bounded model → route → tools loop until the model produces a final reply:
//!
//! ```text
//! AwaitingUserInput → ModelInvoking → Routing ─┬─ Terminate ──────────→ Done
//!                          ↑                   └─ Invoke → ToolInvoking ┐
//!                          └────────────────────────────────────────────┘
//! ```
//!
//! The engine holds no per-session state of its own. Each request locks its session key,
//! loads the history from the [`SessionStore`], works on that copy, and saves it back in
//! one atomic write. Requests for different keys run fully in parallel.
//!
//! # Example
//!
//! ```rust,no_run
//! use carebot::{Agent, CarebotConfig, ConversationEngine, FileSessionStore};
//! use carebot::session_store::{AgentKind, SessionKey};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = CarebotConfig::from_env()?;
//! let mut engine = ConversationEngine::new(Arc::new(FileSessionStore::new(&config.session_dir)))
//!     .with_max_cycles(config.max_cycles)
//!     .with_history_limit(config.history_limit);
//! for agent in Agent::default_agents(&config).await? {
//!     engine.register_agent(agent);
//! }
//!
//! let reply = engine
//!     .process(&SessionKey::new("42", AgentKind::Chat), "I have a headache")
//!     .await?;
//! println!("AI: {}", reply);
//! # Ok(())
//! # }
//! ```

use crate::carebot::agent::Agent;
use crate::carebot::client_wrapper::{AssistantReply, ToolCall, Turn};
use crate::carebot::event::{EngineEvent, EventHandler};
use crate::carebot::history::ConversationHistory;
use crate::carebot::router::{decide, Route};
use crate::carebot::session_store::{AgentKind, SessionKey, SessionLocks, SessionStore};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_MAX_CYCLES: usize = 8;

/// Where a request currently is in the routing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    AwaitingUserInput,
    ModelInvoking,
    Routing,
    ToolInvoking,
    Done,
}

/// The labelled failures a caller of [`ConversationEngine::process`] can see.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Loading or saving the session failed.
    StorageUnavailable(String),
    /// The model call failed; nothing was saved.
    ModelUnavailable(String),
    /// The model was still requesting tools after `max_cycles` calls. The history was saved.
    RoutingLoopExceeded { max_cycles: usize },
    /// No agent is registered for the session key's agent kind.
    UnknownAgent(AgentKind),
}

impl EngineError {
    /// Stable machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::StorageUnavailable(_) => "storage_unavailable",
            EngineError::ModelUnavailable(_) => "model_unavailable",
            EngineError::RoutingLoopExceeded { .. } => "routing_loop_exceeded",
            EngineError::UnknownAgent(_) => "unknown_agent",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            EngineError::ModelUnavailable(msg) => write!(f, "Model unavailable: {}", msg),
            EngineError::RoutingLoopExceeded { max_cycles } => write!(
                f,
                "Routing loop exceeded: still requesting tools after {} model calls",
                max_cycles
            ),
            EngineError::UnknownAgent(kind) => write!(f, "No agent registered for '{}'", kind),
        }
    }
}

impl Error for EngineError {}

/// Outcome of one tool call, already rendered for history.
struct ToolOutcome {
    content: String,
    success: bool,
    error: Option<String>,
}

pub struct ConversationEngine {
    agents: HashMap<AgentKind, Agent>,
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
    max_cycles: usize,
    history_limit: Option<usize>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ConversationEngine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            agents: HashMap::new(),
            store,
            locks: SessionLocks::new(),
            max_cycles: DEFAULT_MAX_CYCLES,
            history_limit: None,
            event_handler: None,
        }
    }

    /// Builder-style [`register_agent`](Self::register_agent).
    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.register_agent(agent);
        self
    }

    /// Register (or replace) the agent serving its kind.
    pub fn register_agent(&mut self, agent: Agent) {
        self.agents.insert(agent.kind(), agent);
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles.max(1);
        self
    }

    pub fn with_history_limit(mut self, history_limit: Option<usize>) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    pub fn agent(&self, kind: AgentKind) -> Option<&Agent> {
        self.agents.get(&kind)
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    async fn emit(&self, event: EngineEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_engine_event(&event).await;
        }
    }

    /// Run one user message through the agent registered for `key.agent_kind` and return the
    /// final assistant text.
    pub async fn process(&self, key: &SessionKey, user_message: &str) -> Result<String, EngineError> {
        let agent = self
            .agents
            .get(&key.agent_kind)
            .ok_or(EngineError::UnknownAgent(key.agent_kind))?;

        let _guard = self.locks.acquire(key).await;
        log::info!("[{}] processing message ({} chars)", key, user_message.len());
        self.emit(EngineEvent::ProcessStarted {
            session: key.clone(),
            message_preview: preview(user_message),
        })
        .await;

        let mut history = self.store.load(key).await.map_err(|err| {
            log::error!("[{}] failed to load session: {}", key, err);
            EngineError::StorageUnavailable(err.to_string())
        })?;

        if history.ensure_system_turn(agent.system_prompt()) {
            log::debug!("[{}] seeded system turn", key);
        }
        history.push(Turn::user(user_message));

        let definitions = agent.tool_definitions();
        let mut state = EngineState::AwaitingUserInput;
        let mut tool_calls_made = 0;
        let mut final_reply: Option<String> = None;
        let mut cycles = 0;

        while cycles < self.max_cycles {
            cycles += 1;
            state = transition(key, state, EngineState::ModelInvoking);
            self.emit(EngineEvent::ModelCallStarted {
                session: key.clone(),
                cycle: cycles,
            })
            .await;

            let reply = agent
                .client()
                .send_message(history.turns(), &definitions)
                .await
                .map_err(|err| {
                    log::error!("[{}] model call failed: {}", key, err);
                    EngineError::ModelUnavailable(err.message().to_string())
                })?;

            let tokens_used = agent.client().get_last_usage().await;
            let call_count = match &reply {
                AssistantReply::WithToolCalls(_, calls) => calls.len(),
                AssistantReply::Plain(_) => 0,
            };
            self.emit(EngineEvent::ModelCallCompleted {
                session: key.clone(),
                cycle: cycles,
                tokens_used,
                response_length: reply.content().len(),
                tool_calls: call_count,
            })
            .await;

            history.push(reply.to_turn());
            state = transition(key, state, EngineState::Routing);

            match decide(&reply) {
                Route::Terminate => {
                    state = transition(key, state, EngineState::Done);
                    final_reply = Some(reply.content().to_string());
                    break;
                }
                Route::Invoke(calls) => {
                    state = transition(key, state, EngineState::ToolInvoking);
                    tool_calls_made += calls.len();
                    self.run_tool_batch(key, agent, &calls, cycles, &mut history)
                        .await;
                }
            }
        }

        log::debug!("[{}] loop finished in {:?} after {} cycles", key, state, cycles);
        if final_reply.is_none() {
            log::warn!(
                "[{}] model still requesting tools after {} calls",
                key,
                self.max_cycles
            );
            self.emit(EngineEvent::RoutingLoopExceeded {
                session: key.clone(),
                max_cycles: self.max_cycles,
            })
            .await;
        }

        let trimmed = match self.history_limit {
            Some(limit) => history.trim_to(limit),
            None => 0,
        };
        if trimmed > 0 {
            log::debug!("[{}] retention dropped {} turns", key, trimmed);
        }

        self.store.save(key, &history).await.map_err(|err| {
            log::error!("[{}] failed to save session: {}", key, err);
            EngineError::StorageUnavailable(err.to_string())
        })?;
        self.emit(EngineEvent::HistorySaved {
            session: key.clone(),
            turn_count: history.len(),
            trimmed,
        })
        .await;

        let reply = final_reply.ok_or(EngineError::RoutingLoopExceeded {
            max_cycles: self.max_cycles,
        })?;

        log::info!(
            "[{}] replied after {} model calls and {} tool calls",
            key,
            cycles,
            tool_calls_made
        );
        self.emit(EngineEvent::ProcessCompleted {
            session: key.clone(),
            cycles,
            tool_calls_made,
            response_length: reply.len(),
        })
        .await;

        Ok(reply)
    }

    /// Execute one batch concurrently and append the results in emission order.
    async fn run_tool_batch(
        &self,
        key: &SessionKey,
        agent: &Agent,
        calls: &[ToolCall],
        cycle: usize,
        history: &mut ConversationHistory,
    ) {
        for call in calls {
            log::debug!(
                "[{}] tool call {} -> {}({})",
                key,
                call.call_id,
                call.tool_name,
                call.arguments
            );
            self.emit(EngineEvent::ToolCallDetected {
                session: key.clone(),
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                arguments: call.arguments.clone(),
                cycle,
            })
            .await;
        }

        let outcomes = join_all(calls.iter().map(|call| execute_call(agent, call))).await;

        for (call, outcome) in calls.iter().zip(outcomes) {
            if let Some(error) = &outcome.error {
                log::warn!("[{}] tool '{}' failed: {}", key, call.tool_name, error);
            }
            self.emit(EngineEvent::ToolExecutionCompleted {
                session: key.clone(),
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                success: outcome.success,
                error: outcome.error.clone(),
                cycle,
            })
            .await;
            history.push(Turn::tool_result(call.call_id.clone(), outcome.content));
        }
    }
}

async fn execute_call(agent: &Agent, call: &ToolCall) -> ToolOutcome {
    match agent
        .tools()
        .execute_tool(&call.tool_name, call.arguments.clone())
        .await
    {
        Ok(result) => ToolOutcome {
            content: result.to_content(),
            success: result.success,
            error: result.error,
        },
        Err(err) => ToolOutcome {
            content: format!("Error: {}", err),
            success: false,
            error: Some(err.to_string()),
        },
    }
}

fn transition(key: &SessionKey, from: EngineState, to: EngineState) -> EngineState {
    log::debug!("[{}] {:?} -> {:?}", key, from, to);
    to
}

fn preview(message: &str) -> String {
    match message.char_indices().nth(120) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}
