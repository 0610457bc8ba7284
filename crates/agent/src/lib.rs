//! The reasoning loop — the heart of Thoughtline.
//!
//! The engine follows a **Thought → Action → Observation** cycle:
//!
//! 1. **Build** the system prompt from the tool registry
//! 2. **Ask** the model, with the query and the transcript so far
//! 3. **Classify** the reply (final answer, action, thought, or invalid)
//! 4. **If action**: dispatch the tool, record the observation, loop to 2
//! 5. **If final answer**: return it with the full transcript
//!
//! The loop stops at the final answer, the iteration cap, or the timeout.

pub mod dispatcher;
pub mod engine;
pub mod history;
pub mod parser;
pub mod prompt;
pub mod status;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use dispatcher::ToolDispatcher;
pub use engine::ReasoningEngine;
pub use history::{HistoryEntry, HistoryKind, HistoryLog};
pub use parser::{Parsed, ParsedAction, ResponseParser};
pub use prompt::{PromptBuilder, render_turn};
pub use status::{StatusEmitter, StatusObserver, StatusUpdate, SubscriptionId};
