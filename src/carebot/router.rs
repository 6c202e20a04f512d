//! Routing decision taken after every model turn.
//!
//! The router is a pure function of the latest [`AssistantReply`]: either the model asked for
//! tools and the whole batch must run before the model is called again, or the cycle is over.

use crate::carebot::client_wrapper::{AssistantReply, ToolCall};

/// What the engine does next.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Run every call, in emission order, then return to the model.
    Invoke(Vec<ToolCall>),
    /// The reply is final for this request.
    Terminate,
}

pub fn decide(reply: &AssistantReply) -> Route {
    match reply {
        AssistantReply::WithToolCalls(_, calls) if !calls.is_empty() => Route::Invoke(calls.clone()),
        _ => Route::Terminate,
    }
}
