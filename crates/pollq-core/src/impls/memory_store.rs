//! In-memory queue store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Message, MessageId, QueueDescriptor, QueueSettings};
use crate::error::StoreResult;
use crate::observability::QueueCounts;
use crate::ports::{Clock, IdGenerator, QueueStore, SystemClock, UlidGenerator};

/// One queue and its messages, in send order.
struct StoredQueue {
    descriptor: QueueDescriptor,
    messages: Vec<Message>,
}

impl StoredQueue {
    fn receive(&mut self, now: chrono::DateTime<chrono::Utc>, max_count: usize) -> Vec<Message> {
        let timeout = self.descriptor.visibility_timeout();
        self.messages
            .iter_mut()
            .filter(|m| m.is_receivable(now, timeout))
            .take(max_count)
            .map(|m| {
                m.mark_received(now);
                m.clone()
            })
            .collect()
    }

    fn counts(&self, now: chrono::DateTime<chrono::Utc>) -> QueueCounts {
        let timeout = self.descriptor.visibility_timeout();
        let mut counts = QueueCounts::default();
        for message in &self.messages {
            counts.record(message.visibility(now, timeout));
        }
        counts
    }
}

/// Reference `QueueStore` kept entirely in memory.
///
/// Design:
/// - A single lock guards all queues, so select + stamp in
///   `receive_messages` is atomic with respect to every other call.
/// - No lock is held across an `.await` outside this module.
/// - Visibility is derived from timestamps on every read; nothing is
///   written when a visibility timeout expires.
pub struct InMemoryQueueStore<C: Clock = SystemClock> {
    queues: Mutex<BTreeMap<String, StoredQueue>>,
    clock: Arc<C>,
    ids: UlidGenerator<Arc<C>>,
}

impl InMemoryQueueStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl Default for InMemoryQueueStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryQueueStore<C> {
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            queues: Mutex::new(BTreeMap::new()),
            ids: UlidGenerator::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Number of messages held for `name`, whatever their visibility.
    pub async fn message_count(&self, name: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(name)
            .map_or(0, |queue| queue.messages.len())
    }

    /// Messages of `name` grouped by visibility at the current clock time.
    pub async fn counts(&self, name: &str) -> Option<QueueCounts> {
        let now = self.clock.now();
        let queues = self.queues.lock().await;
        queues.get(name).map(|queue| queue.counts(now))
    }
}

#[async_trait]
impl<C: Clock + 'static> QueueStore for InMemoryQueueStore<C> {
    async fn create_queue(&self, name: &str, settings: QueueSettings) -> StoreResult<()> {
        let now = self.clock.now();
        let mut queues = self.queues.lock().await;
        if queues.contains_key(name) {
            tracing::debug!(queue = name, "queue already exists");
            return Ok(());
        }
        queues.insert(
            name.to_string(),
            StoredQueue {
                descriptor: QueueDescriptor::new(name, settings, now),
                messages: Vec::new(),
            },
        );
        tracing::debug!(
            queue = name,
            visibility_timeout_secs = settings.visibility_timeout_seconds,
            delay_secs = settings.delay_seconds,
            "queue created"
        );
        Ok(())
    }

    async fn delete_queue(&self, name: &str) -> StoreResult<()> {
        let removed = self.queues.lock().await.remove(name);
        if let Some(queue) = removed {
            tracing::debug!(queue = name, dropped = queue.messages.len(), "queue deleted");
        }
        Ok(())
    }

    async fn send_message(
        &self,
        name: &str,
        body: String,
        delay: Option<Duration>,
    ) -> StoreResult<Option<MessageId>> {
        let now = self.clock.now();
        let mut queues = self.queues.lock().await;
        let Some(queue) = queues.get_mut(name) else {
            tracing::warn!(queue = name, "send to unknown queue");
            return Ok(None);
        };

        let id = self.ids.generate_message_id();
        let delay = delay.unwrap_or_else(|| queue.descriptor.delay());
        queue.messages.push(Message::new(id, name, body, now, delay));
        Ok(Some(id))
    }

    async fn delete_message(&self, name: &str, id: MessageId) -> StoreResult<()> {
        let mut queues = self.queues.lock().await;
        if let Some(queue) = queues.get_mut(name) {
            queue.messages.retain(|m| m.id != id);
        }
        Ok(())
    }

    async fn receive_messages(&self, name: &str, max_count: usize) -> StoreResult<Vec<Message>> {
        if max_count == 0 {
            return Ok(Vec::new());
        }
        let now = self.clock.now();
        let mut queues = self.queues.lock().await;
        Ok(queues
            .get_mut(name)
            .map(|queue| queue.receive(now, max_count))
            .unwrap_or_default())
    }

    async fn list_queues(&self) -> StoreResult<Vec<QueueDescriptor>> {
        let queues = self.queues.lock().await;
        Ok(queues.values().map(|q| q.descriptor.clone()).collect())
    }

    async fn get_queue(&self, name: &str) -> StoreResult<Option<QueueDescriptor>> {
        let queues = self.queues.lock().await;
        Ok(queues.get(name).map(|q| q.descriptor.clone()))
    }
}
