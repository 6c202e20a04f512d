// src/carebot/mod.rs

pub mod agent;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod engine;
pub mod event;
pub mod history;
pub mod router;
pub mod session_store;
pub mod tool_protocol;
pub mod tool_protocols;
pub mod tools;

#[cfg(feature = "http-server")]
pub mod server;

pub use agent::Agent;
pub use engine::ConversationEngine;
