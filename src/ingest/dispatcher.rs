//! Event consumption
//!
//! One long-lived task polls the subscription and invokes the handler
//! synchronously per message. The loop survives everything except a
//! fatal poll error or the shutdown signal: undecodable messages are
//! skipped, failed handlings are logged and forwarded to the dead-letter
//! topic so they stay observable instead of silently vanishing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::IngestionEvent;
use crate::broker::{BrokerError, Message, MessageQueue, Subscription};

/// Per-message handler invoked by the dispatcher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: IngestionEvent) -> anyhow::Result<()>;
}

pub struct Dispatcher {
    subscription: Box<dyn Subscription>,
    handler: Arc<dyn EventHandler>,
    queue: Arc<dyn MessageQueue>,
    dead_letter_topic: String,
    poll_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    pub fn new(
        subscription: Box<dyn Subscription>,
        handler: Arc<dyn EventHandler>,
        queue: Arc<dyn MessageQueue>,
        topic: &str,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscription,
            handler,
            queue,
            dead_letter_topic: format!("{topic}.dlq"),
            poll_timeout: Duration::from_secs(1),
            shutdown,
        }
    }

    #[cfg(test)]
    fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Consume until shutdown or a fatal poll error.
    ///
    /// Shutdown latency is bounded by the poll timeout. A message pulled
    /// but not yet handled when the process exits is lost; that is the
    /// accepted shutdown risk for this loop.
    pub async fn run(mut self) -> Result<(), BrokerError> {
        tracing::info!(
            poll_timeout_ms = self.poll_timeout.as_millis() as u64,
            "Dispatcher started"
        );

        loop {
            if *self.shutdown.borrow() {
                tracing::info!("Dispatcher shutting down");
                return Ok(());
            }

            let polled = tokio::select! {
                _ = self.shutdown.changed() => continue,
                polled = self.subscription.poll(self.poll_timeout) => polled?,
            };

            let Some(message) = polled else {
                continue;
            };
            self.dispatch(message).await;
        }
    }

    async fn dispatch(&self, message: Message) {
        let event: IngestionEvent = match serde_json::from_slice(&message.value) {
            Ok(event) => event,
            Err(err) => {
                // Poison message: skip it, never stall the stream.
                tracing::warn!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %err,
                    "Undecodable message skipped"
                );
                return;
            }
        };

        tracing::info!(
            file_id = event.file_id,
            file_key = %event.file_key,
            offset = message.offset,
            "Handling ingestion event"
        );

        if let Err(err) = self.handler.handle(event).await {
            tracing::error!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %err,
                "Handler failed, forwarding to dead-letter topic"
            );
            self.dead_letter(&message).await;
        }
    }

    async fn dead_letter(&self, message: &Message) {
        if let Err(err) = self
            .queue
            .publish(&self.dead_letter_topic, &message.key, &message.value)
            .await
        {
            tracing::error!(
                topic = %self.dead_letter_topic,
                error = %err,
                "Dead-letter publish failed, message lost"
            );
        }
    }
}
