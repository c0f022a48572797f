//! Where relayed fragments go.
//!
//! The orchestrator writes each model fragment to a [`ChunkSink`] as soon as
//! it arrives. A closed sink means the client went away.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// The consumer of a sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sink closed")
    }
}

impl std::error::Error for SinkClosed {}

#[async_trait]
pub trait ChunkSink: Send {
    /// Deliver one fragment. Waits while the consumer is behind.
    async fn send(&mut self, fragment: &str) -> Result<(), SinkClosed>;
}

#[async_trait]
impl ChunkSink for mpsc::Sender<String> {
    async fn send(&mut self, fragment: &str) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, fragment.to_string())
            .await
            .map_err(|_| SinkClosed)
    }
}

/// Collects fragments in memory.
#[async_trait]
impl ChunkSink for Vec<String> {
    async fn send(&mut self, fragment: &str) -> Result<(), SinkClosed> {
        self.push(fragment.to_string());
        Ok(())
    }
}
