//! Streaming chat orchestration for ragchat.
//!
//! A request flows **Init → Routing → Assembling → Streaming → Done**:
//!
//! 1. **Validate** the `{id, content}` request
//! 2. **Route** the message through the tool intents; a matching tool's
//!    output replaces the message
//! 3. **Assemble** the turn: system prompt plus the user message, with
//!    retrieved references when no tool answered
//! 4. **Stream** one model call, relaying each fragment to the sink as it
//!    arrives
//!
//! [`Services`] builds the shared clients once at startup.

pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod services;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{ChatError, Phase, SetupError};
pub use orchestrator::{ChatRequest, ChatStream, Orchestrator, RelaySummary, StreamEnd};
pub use services::{open_index, Services};
pub use sink::{ChunkSink, SinkClosed};
