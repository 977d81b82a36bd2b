//! Event publication
//!
//! Registration must return to the caller without waiting on the broker,
//! so events go through a bounded queue drained by one supervised worker
//! task. The worker retries each publish a fixed number of times with
//! exponential backoff and then gives up: delivery is at-most-effort and
//! exhaustion is an observability event, never a caller-visible error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::IngestionEvent;
use crate::broker::MessageQueue;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub topic: String,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub queue_capacity: usize,
}

impl PublisherConfig {
    pub fn new(topic: impl Into<String>, queue_capacity: usize) -> Self {
        Self {
            topic: topic.into(),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            queue_capacity,
        }
    }
}

/// Handle the registration path uses to enqueue events.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<IngestionEvent>,
}

impl EventPublisher {
    /// Start the publish worker and return the submission handle.
    pub fn spawn(
        queue: Arc<dyn MessageQueue>,
        config: PublisherConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<IngestionEvent>(config.queue_capacity);

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                publish_with_retry(queue.as_ref(), &config, &event).await;
            }
            tracing::debug!("Publish worker stopped");
        });

        (Self { tx }, worker)
    }

    /// Enqueue an event without blocking.
    ///
    /// A full queue drops the event with an error log: backpressure is
    /// surfaced to operators, not to the registering caller.
    pub fn submit(&self, event: IngestionEvent) {
        if let Err(err) = self.tx.try_send(event) {
            match err {
                mpsc::error::TrySendError::Full(event) => {
                    tracing::error!(
                        file_id = event.file_id,
                        file_key = %event.file_key,
                        "Publish queue full, dropping ingestion event"
                    );
                }
                mpsc::error::TrySendError::Closed(event) => {
                    tracing::error!(
                        file_id = event.file_id,
                        "Publish worker gone, dropping ingestion event"
                    );
                }
            }
        }
    }
}

/// Publish one event, retrying up to `max_attempts` with doubling delays.
/// Exhaustion is logged and swallowed.
pub async fn publish_with_retry(
    queue: &dyn MessageQueue,
    config: &PublisherConfig,
    event: &IngestionEvent,
) {
    let payload = match serde_json::to_vec(event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(
                file_id = event.file_id,
                error = %err,
                "Failed to encode ingestion event"
            );
            return;
        }
    };

    let max_attempts = config.max_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=max_attempts {
        match queue
            .publish(&config.topic, event.partition_key(), &payload)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    file_id = event.file_id,
                    file_key = %event.file_key,
                    attempt,
                    "Published ingestion event"
                );
                return;
            }
            Err(err) => {
                tracing::warn!(
                    file_id = event.file_id,
                    attempt,
                    max_attempts,
                    error = %err,
                    "Publish attempt failed"
                );
                last_error = Some(err);
            }
        }

        if attempt < max_attempts {
            let delay = config.base_delay * 2u32.pow(attempt - 1);
            tokio::time::sleep(delay).await;
        }
    }

    tracing::error!(
        file_id = event.file_id,
        file_key = %event.file_key,
        error = %last_error.expect("at least one attempt"),
        "Publish retries exhausted, event lost"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BrokerError, Subscription};

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::time::Instant;

    struct FlakyQueue {
        failures_left: AtomicU32,
        attempts: Mutex<Vec<Instant>>,
    }

    impl FlakyQueue {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(times),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessageQueue for FlakyQueue {
        async fn publish(
            &self,
            topic: &str,
            _key: &[u8],
            _value: &[u8],
        ) -> Result<(), BrokerError> {
            self.attempts.lock().unwrap().push(Instant::now());
            if self.failures_left.fetch_update(
                Ordering::SeqCst,
                Ordering::SeqCst,
                |n| n.checked_sub(1),
            ).is_ok()
            {
                return Err(BrokerError::Publish {
                    topic: topic.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            Ok(())
        }

        async fn subscribe(
            &self,
            _topics: &[String],
        ) -> Result<Box<dyn Subscription>, BrokerError> {
            Err(BrokerError::Subscribe("not a real broker".to_string()))
        }
    }

    fn sample_event() -> IngestionEvent {
        IngestionEvent {
            file_key: "resume/7/42.pdf".to_string(),
            file_id: 42,
            user_id: 7,
            filename: "cv.pdf".to_string(),
            filetype: "pdf".to_string(),
            filesize: 10_240,
            created_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_makes_three_attempts() {
        let queue = FlakyQueue::failing(2);
        let config = PublisherConfig::new("t", 8);

        publish_with_retry(&queue, &config, &sample_event()).await;

        let attempts = queue.attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 3);
        // Backoff doubles: 500ms after the first failure, 1s after the
        // second, so the gaps strictly increase.
        let first_gap = attempts[1] - attempts[0];
        let second_gap = attempts[2] - attempts[1];
        assert_eq!(first_gap, Duration::from_millis(500));
        assert_eq!(second_gap, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_stops_after_three_attempts() {
        let queue = FlakyQueue::failing(u32::MAX);
        let config = PublisherConfig::new("t", 8);

        // The failure is swallowed, the caller sees nothing.
        publish_with_retry(&queue, &config, &sample_event()).await;

        assert_eq!(queue.attempt_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_still_publishes_once() {
        let queue = FlakyQueue::failing(0);
        let mut config = PublisherConfig::new("t", 8);
        config.max_attempts = 0;

        publish_with_retry(&queue, &config, &sample_event()).await;

        assert_eq!(queue.attempt_count(), 1);
    }

    #[tokio::test]
    async fn test_worker_drains_submissions() {
        let queue = Arc::new(FlakyQueue::failing(0));
        let config = PublisherConfig::new("t", 8);
        let (publisher, worker) = EventPublisher::spawn(queue.clone(), config);

        publisher.submit(sample_event());
        drop(publisher);
        worker.await.unwrap();

        assert_eq!(queue.attempt_count(), 1);
    }
}
