//! Model clients and the HTTP plumbing they share with the built-in tools.

pub mod common;
pub mod openai;
