use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pollq_core::config::ProcessorConfig;
use pollq_core::domain::{Message, QueueSettings};
use pollq_core::telemetry::init_tracing;
use pollq_core::{GiveUpAfter, HandlerError, InMemoryQueueStore, MessageHandler, QueueProcessor, QueueStore};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct HelloPayload {
    name: String,
}

/// Greets, after failing a configurable number of times first.
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl MessageHandler for HelloHandler {
    async fn handle(&self, message: &Message) -> Result<bool, HandlerError> {
        let payload: HelloPayload = message.body_json()?;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            warn!(message_id = %message.id, left, "intentional failure");
            return Ok(false);
        }

        info!(
            message_id = %message.id,
            receive_count = message.approximate_receive_count,
            "Hello, {}!",
            payload.name
        );
        Ok(true)
    }
}

/// Demo settings, read from `POLLQ_*` environment variables.
struct DemoConfig {
    processor: ProcessorConfig,
    visibility_timeout: Duration,
    messages: usize,
    failures: u32,
}

impl DemoConfig {
    fn from_env() -> Self {
        let queue = std::env::var("POLLQ_QUEUE").unwrap_or_else(|_| "hello".to_string());
        let batch = env_or("POLLQ_BATCH", 4);
        let poll_ms = env_or("POLLQ_POLL_MS", 500);
        let visibility_secs = env_or("POLLQ_VISIBILITY_SECS", 2);

        Self {
            processor: ProcessorConfig::new(queue)
                .with_max_messages(batch)
                .with_poll_delay(Duration::from_millis(poll_ms)),
            visibility_timeout: Duration::from_secs(visibility_secs),
            messages: env_or("POLLQ_MESSAGES", 5),
            failures: env_or("POLLQ_FAILURES", 2),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> pollq_core::Result<()> {
    init_tracing();
    let config = DemoConfig::from_env();
    let queue = config.processor.queue_name.clone();

    // (A) store + queue
    let store = Arc::new(InMemoryQueueStore::new());
    store
        .create_queue(
            &queue,
            QueueSettings::default().with_visibility_timeout(config.visibility_timeout),
        )
        .await?;

    // (B) messages
    for i in 0..config.messages {
        let body = serde_json::json!({ "name": format!("pollq-{i}") }).to_string();
        if let Some(id) = store.send_message(&queue, body, None).await? {
            info!(message_id = %id, "sent");
        }
    }

    // (C) processor
    let processor = QueueProcessor::new(
        store.clone(),
        config.processor,
        GiveUpAfter::new(HelloHandler::new(config.failures)),
    )?;
    processor.start();

    // (D) wait for the queue to drain, or Ctrl-C
    tokio::select! {
        _ = async {
            while store.message_count(&queue).await > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        } => info!("queue drained"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    // (E) shutdown
    processor.stop_and_join().await;
    info!(status = ?processor.status(), "done");
    Ok(())
}
