//! Ordered, append-only conversation history for one session.
//!
//! A [`ConversationHistory`] is the transient in-memory copy the engine works on during a
//! single request; the durable bytes belong to the
//! [`SessionStore`](crate::session_store::SessionStore).
//!
//! # Invariants
//!
//! - at most one system turn, and if present it sits at index 0
//! - every tool-result turn answers a `call_id` emitted by an earlier assistant turn
//! - an assistant turn with N tool calls is followed by exactly N tool-result turns, in
//!   emission order, before any other turn
//!
//! [`ConversationHistory::validate`] checks all three; the file store runs it on every load.

use crate::carebot::client_wrapper::{Role, Turn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;

/// Violation of one of the history invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// A system turn appears somewhere other than index 0.
    MisplacedSystemTurn(usize),
    /// A tool-result turn has no `tool_call_id`, or it names an unknown call.
    UnlinkedToolResult(usize),
    /// The tool-result turns after an assistant turn do not answer its calls one-for-one.
    IncompleteToolBatch(usize),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::MisplacedSystemTurn(i) => {
                write!(f, "system turn at index {} (only index 0 allowed)", i)
            }
            HistoryError::UnlinkedToolResult(i) => {
                write!(f, "tool-result turn at index {} has no matching call", i)
            }
            HistoryError::IncompleteToolBatch(i) => write!(
                f,
                "assistant turn at index {} is not followed by one result per tool call",
                i
            ),
        }
    }
}

impl Error for HistoryError {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-ordered turns without checking them; call [`validate`](Self::validate)
    /// when the source is untrusted.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn has_system_turn(&self) -> bool {
        matches!(self.turns.first(), Some(turn) if turn.role == Role::System)
    }

    /// Prepend the agent's system turn unless the history already starts with one.
    ///
    /// Returns `true` when a turn was inserted.
    pub fn ensure_system_turn(&mut self, system_prompt: &str) -> bool {
        if self.has_system_turn() {
            return false;
        }
        self.turns.insert(0, Turn::system(system_prompt));
        true
    }

    /// Drop the oldest turns after the system turn until at most `max_turns` remain.
    ///
    /// Cuts happen only in front of a user turn so that no tool-result is separated from the
    /// assistant turn that requested it. The most recent user exchange is always kept, even
    /// when it alone exceeds the limit. Returns the number of turns removed.
    pub fn trim_to(&mut self, max_turns: usize) -> usize {
        if self.turns.len() <= max_turns {
            return 0;
        }
        let start = usize::from(self.has_system_turn());
        let len = self.turns.len();

        let user_positions: Vec<usize> = self
            .turns
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, turn)| turn.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        let cut = user_positions
            .iter()
            .copied()
            .find(|&i| start + (len - i) <= max_turns)
            .or_else(|| user_positions.last().copied());

        match cut {
            Some(cut) if cut > start => {
                self.turns.drain(start..cut);
                cut - start
            }
            _ => 0,
        }
    }

    /// Check the ordering and linkage invariants described in the module docs.
    pub fn validate(&self) -> Result<(), HistoryError> {
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut i = 0;
        while i < self.turns.len() {
            let turn = &self.turns[i];
            match turn.role {
                Role::System if i != 0 => return Err(HistoryError::MisplacedSystemTurn(i)),
                Role::Assistant if !turn.tool_calls.is_empty() => {
                    for (offset, call) in turn.tool_calls.iter().enumerate() {
                        let answered = self.turns.get(i + 1 + offset).is_some_and(|result| {
                            result.role == Role::Tool
                                && result.tool_call_id.as_deref() == Some(call.call_id.as_str())
                        });
                        if !answered {
                            return Err(HistoryError::IncompleteToolBatch(i));
                        }
                        emitted.insert(call.call_id.as_str());
                    }
                    i += 1 + turn.tool_calls.len();
                    continue;
                }
                Role::Tool => {
                    // Results are consumed with their batch above; reaching one here means it
                    // is orphaned or duplicated.
                    let known = turn
                        .tool_call_id
                        .as_deref()
                        .is_some_and(|id| emitted.contains(id));
                    if !known {
                        return Err(HistoryError::UnlinkedToolResult(i));
                    }
                    return Err(HistoryError::IncompleteToolBatch(i));
                }
                _ => {}
            }
            i += 1;
        }
        Ok(())
    }
}
