//! Language-model agent seam
//!
//! A `ChatAgent` takes one text prompt and produces a stream of events
//! that ends with a final complete message. Consumers drain the stream
//! and keep only that final message; intermediate deltas exist for
//! progress observation. Dropping the `AgentRun` abandons the underlying
//! request, which is how deadline cancellation works.

mod openai;

pub use openai::OpenAiAgent;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Request(String),

    #[error("agent returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("agent stream error: {0}")]
    Stream(String),
}

/// One event from a running agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Partial content. Discarded by the parsing pipeline.
    Delta(String),
    /// Complete message content. The last one wins.
    Message(String),
}

/// Handle over a running agent invocation.
pub struct AgentRun {
    rx: mpsc::Receiver<Result<AgentEvent, AgentError>>,
}

impl AgentRun {
    /// Channel-backed run: the producing side feeds events, the handle
    /// is what callers iterate. Used by implementations and test stubs.
    pub fn channel(
        capacity: usize,
    ) -> (mpsc::Sender<Result<AgentEvent, AgentError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    /// Next event, or `None` once the stream is exhausted.
    pub async fn next_event(&mut self) -> Option<Result<AgentEvent, AgentError>> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait ChatAgent: Send + Sync {
    async fn run(&self, prompt: &str) -> Result<AgentRun, AgentError>;
}
