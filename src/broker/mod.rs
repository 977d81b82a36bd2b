//! Message broker seam
//!
//! The pipeline talks to the broker through two narrow traits so the
//! transport can be swapped (the in-process broker here, Kafka or
//! anything else behind the same contract in a larger deployment).
//!
//! Delivery semantics are deliberately modest: publish is best-effort
//! (callers layer their own bounded retry on top), consume is
//! at-least-once within a single consumer group, and ordering is only
//! guaranteed among messages sharing a partition key.

mod memory;

pub use memory::MemoryBroker;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("publish to {topic} failed: {message}")]
    Publish { topic: String, message: String },

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("broker closed")]
    Closed,
}

/// One consumed message with its position metadata.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub partition: u32,
    pub offset: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish `value` keyed by `key`. All messages sharing a key land on
    /// the same partition and keep their relative order.
    async fn publish(&self, topic: &str, key: &[u8], value: &[u8])
        -> Result<(), BrokerError>;

    /// Open a subscription over `topics`.
    async fn subscribe(&self, topics: &[String])
        -> Result<Box<dyn Subscription>, BrokerError>;
}

#[async_trait]
pub trait Subscription: Send + Sync {
    /// Wait up to `timeout` for the next message. An empty poll returns
    /// `Ok(None)` and is not an error.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Message>, BrokerError>;
}
