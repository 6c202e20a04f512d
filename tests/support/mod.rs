#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use carebot::client_wrapper::{ModelError, ToolDefinition};
use carebot::event::{EngineEvent, EventHandler};
use carebot::history::ConversationHistory;
use carebot::{
    AssistantReply, ClientWrapper, InMemorySessionStore, SessionKey, SessionStore, StorageError,
    Turn,
};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral localhost port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Model double that replays a fixed script and records what it was sent.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<AssistantReply, ModelError>>>,
    fallback: Option<AssistantReply>,
    pub seen_turns: Mutex<Vec<Vec<Turn>>>,
    pub seen_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<AssistantReply, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            seen_turns: Mutex::new(Vec::new()),
            seen_tools: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: Vec<AssistantReply>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    /// Returned once the script is used up.
    pub fn with_fallback(mut self, reply: AssistantReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.seen_turns.lock().unwrap().len()
    }

    pub fn turns_of_call(&self, index: usize) -> Vec<Turn> {
        self.seen_turns.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ClientWrapper for ScriptedClient {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn send_message(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, ModelError> {
        self.seen_turns.lock().unwrap().push(turns.to_vec());
        self.seen_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ModelError::new("script exhausted")),
        }
    }
}

/// In-memory store with switchable failures and call counters.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemorySessionStore,
    pub fail_load: AtomicBool,
    pub fail_save: AtomicBool,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_loads() -> Self {
        let store = Self::default();
        store.fail_load.store(true, Ordering::SeqCst);
        store
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn load(&self, key: &SessionKey) -> Result<ConversationHistory, StorageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("connection refused".into()));
        }
        self.inner.load(key).await
    }

    async fn save(
        &self,
        key: &SessionKey,
        history: &ConversationHistory,
    ) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk full".into()));
        }
        self.inner.save(key, history).await
    }
}

/// Collects the variant name of every event it sees.
#[derive(Default)]
pub struct RecordingHandler {
    pub events: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_engine_event(&self, event: &EngineEvent) {
        let name = match event {
            EngineEvent::ProcessStarted { .. } => "ProcessStarted",
            EngineEvent::ModelCallStarted { .. } => "ModelCallStarted",
            EngineEvent::ModelCallCompleted { .. } => "ModelCallCompleted",
            EngineEvent::ToolCallDetected { .. } => "ToolCallDetected",
            EngineEvent::ToolExecutionCompleted { .. } => "ToolExecutionCompleted",
            EngineEvent::RoutingLoopExceeded { .. } => "RoutingLoopExceeded",
            EngineEvent::HistorySaved { .. } => "HistorySaved",
            EngineEvent::ProcessCompleted { .. } => "ProcessCompleted",
        };
        self.events.lock().unwrap().push(name.to_string());
    }
}
