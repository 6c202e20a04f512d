//! Conversation engine event system.
//!
//! Implement [`EventHandler`] to receive real-time notifications about each processed
//! request: model round-trips, tool dispatch, loop overruns and persistence.
//!
//! # Event Flow (during a typical `process()` call)
//!
//! ```text
//! ProcessStarted
//!   └─ ModelCallStarted { cycle: 1 }
//!   └─ ModelCallCompleted { cycle: 1 }
//!   └─ (if the reply requested tools)
//!       ├─ ToolCallDetected        (once per call, emission order)
//!       ├─ ToolExecutionCompleted  (once per call, emission order)
//!       ├─ ModelCallStarted { cycle: 2 }
//!       └─ ModelCallCompleted { cycle: 2 }
//!   └─ (RoutingLoopExceeded if the cycle bound was hit)
//! HistorySaved
//! ProcessCompleted
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use carebot::event::{EngineEvent, EventHandler};
//! use async_trait::async_trait;
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl EventHandler for PrintHandler {
//!     async fn on_engine_event(&self, event: &EngineEvent) {
//!         if let EngineEvent::ToolCallDetected { tool_name, .. } = event {
//!             println!("tool requested: {}", tool_name);
//!         }
//!     }
//! }
//! ```

use crate::carebot::client_wrapper::TokenUsage;
use crate::carebot::session_store::SessionKey;
use async_trait::async_trait;

/// Events emitted by the [`ConversationEngine`](crate::engine::ConversationEngine).
///
/// Every variant carries the session key so handlers can attribute events without
/// external state.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A request was accepted and its session lock acquired.
    ProcessStarted {
        session: SessionKey,
        /// First ~120 characters of the user message.
        message_preview: String,
    },

    /// Fired before each model round-trip. Cycle 1 is the call that answers the user turn.
    ModelCallStarted { session: SessionKey, cycle: usize },

    ModelCallCompleted {
        session: SessionKey,
        cycle: usize,
        tokens_used: Option<TokenUsage>,
        response_length: usize,
        /// Number of tool calls the reply requested.
        tool_calls: usize,
    },

    /// One tool call taken from the latest assistant turn.
    ToolCallDetected {
        session: SessionKey,
        call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
        cycle: usize,
    },

    /// A tool finished (or failed); the outcome is already folded into history.
    ToolExecutionCompleted {
        session: SessionKey,
        call_id: String,
        tool_name: String,
        success: bool,
        error: Option<String>,
        cycle: usize,
    },

    /// The model kept requesting tools until the cycle bound was reached.
    RoutingLoopExceeded {
        session: SessionKey,
        max_cycles: usize,
    },

    /// The updated history was written to the session store.
    HistorySaved {
        session: SessionKey,
        turn_count: usize,
        /// Turns dropped by the retention limit before saving.
        trimmed: usize,
    },

    /// `process()` returned a reply.
    ProcessCompleted {
        session: SessionKey,
        cycles: usize,
        tool_calls_made: usize,
        response_length: usize,
    },
}

/// Receiver for [`EngineEvent`]s; every method has a no-op default.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_engine_event(&self, _event: &EngineEvent) {}
}
