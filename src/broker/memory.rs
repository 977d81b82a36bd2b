//! In-process partitioned broker
//!
//! Topics are split into a fixed number of partitions; a message's
//! partition is chosen by hashing its key, so per-key FIFO order holds
//! end to end. Every subscription drains the shared partition queues,
//! which makes all subscribers one consumer group: a message is
//! delivered to exactly one of them.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{BrokerError, Message, MessageQueue, Subscription};

#[derive(Default)]
struct PartitionState {
    queue: VecDeque<Message>,
    next_offset: i64,
}

struct TopicState {
    partitions: Vec<Mutex<PartitionState>>,
}

impl TopicState {
    fn new(partitions: usize) -> Self {
        Self {
            partitions: (0..partitions).map(|_| Mutex::default()).collect(),
        }
    }
}

struct BrokerInner {
    partitions: usize,
    topics: Mutex<HashMap<String, Arc<TopicState>>>,
    /// Woken on every publish so idle subscribers re-scan their queues.
    publish_signal: Notify,
}

#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    pub fn new(partitions: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                partitions: partitions.max(1),
                topics: Mutex::new(HashMap::new()),
                publish_signal: Notify::new(),
            }),
        }
    }

    fn topic(&self, name: &str) -> Arc<TopicState> {
        let mut topics = self.inner.topics.lock().expect("broker topics poisoned");
        topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TopicState::new(self.inner.partitions)))
            .clone()
    }

    fn partition_for(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.inner.partitions
    }
}

#[async_trait]
impl MessageQueue for MemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), BrokerError> {
        let state = self.topic(topic);
        let partition = self.partition_for(key);

        {
            let mut slot = state.partitions[partition]
                .lock()
                .expect("partition poisoned");
            let offset = slot.next_offset;
            slot.next_offset += 1;
            slot.queue.push_back(Message {
                topic: topic.to_string(),
                partition: partition as u32,
                offset,
                key: key.to_vec(),
                value: value.to_vec(),
            });
        }

        self.inner.publish_signal.notify_waiters();
        Ok(())
    }

    async fn subscribe(
        &self,
        topics: &[String],
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        if topics.is_empty() {
            return Err(BrokerError::Subscribe("no topics given".to_string()));
        }
        // Materialize topic state up front so publishes and polls agree
        // on the same partition queues.
        let states = topics.iter().map(|t| self.topic(t)).collect();
        Ok(Box::new(MemorySubscription {
            inner: Arc::clone(&self.inner),
            states,
            cursor: 0,
        }))
    }
}

struct MemorySubscription {
    inner: Arc<BrokerInner>,
    states: Vec<Arc<TopicState>>,
    /// Round-robin position across (topic, partition) pairs so one busy
    /// partition cannot starve the rest.
    cursor: usize,
}

impl MemorySubscription {
    fn try_next(&mut self) -> Option<Message> {
        let total: usize = self.states.iter().map(|s| s.partitions.len()).sum();
        for step in 0..total {
            let index = (self.cursor + step) % total;
            let mut remaining = index;
            for state in &self.states {
                if remaining < state.partitions.len() {
                    let mut slot = state.partitions[remaining]
                        .lock()
                        .expect("partition poisoned");
                    if let Some(message) = slot.queue.pop_front() {
                        self.cursor = (index + 1) % total;
                        return Some(message);
                    }
                    break;
                }
                remaining -= state.partitions.len();
            }
        }
        None
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Message>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for the wakeup before scanning, otherwise a
            // publish landing between scan and await would be missed.
            let inner = Arc::clone(&self.inner);
            let notified = inner.publish_signal.notified();
            tokio::pin!(notified);

            if let Some(message) = self.try_next() {
                return Ok(Some(message));
            }

            tokio::select! {
                _ = &mut notified => continue,
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }
}
