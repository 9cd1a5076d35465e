//! QueueStore port - persistent queue storage.
//!
//! The store owns every queue and message. Processors only hold what a
//! single receive hands them.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Message, MessageId, QueueDescriptor, QueueSettings};
use crate::error::StoreResult;

/// Storage contract the processor depends on.
///
/// Any operation may fail with `StoreError` when the underlying storage is
/// unavailable. Implementations do not retry.
///
/// # Receive atomicity
/// `receive_messages` must select eligible messages and stamp them
/// (`last_access_at = now`, receive count + 1) as one atomic step, so that
/// concurrent receivers never get the same message inside its visibility
/// window.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Create a queue. Idempotent: an existing queue keeps its settings.
    async fn create_queue(&self, name: &str, settings: QueueSettings) -> StoreResult<()>;

    /// Remove a queue together with all of its messages. No-op when absent.
    async fn delete_queue(&self, name: &str) -> StoreResult<()>;

    /// Enqueue a message.
    ///
    /// `delay` overrides the queue's default delivery delay.
    /// Returns `None` when the queue does not exist; callers must check.
    async fn send_message(
        &self,
        name: &str,
        body: String,
        delay: Option<Duration>,
    ) -> StoreResult<Option<MessageId>>;

    /// Remove one message. No-op when absent.
    async fn delete_message(&self, name: &str, id: MessageId) -> StoreResult<()>;

    /// Hand out up to `max_count` visible messages, stamping each as received.
    async fn receive_messages(&self, name: &str, max_count: usize) -> StoreResult<Vec<Message>>;

    async fn list_queues(&self) -> StoreResult<Vec<QueueDescriptor>>;

    async fn get_queue(&self, name: &str) -> StoreResult<Option<QueueDescriptor>>;
}
