//! QueueProcessor - drains one queue through a handler.
//!
//! # Cycle
//! 1. receive up to `max_messages_per_receive` messages
//! 2. dispatch the whole batch concurrently
//! 3. `Ok(true)` -> delete (commit point)
//! 4. `Ok(false)` / `Err(_)` -> leave it; it becomes visible again
//!
//! Store errors and handler errors both fail the cycle and feed the
//! runner's backoff. One failing message never blocks its siblings from
//! committing.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::runner::{BackgroundRunner, BackgroundWork};
use crate::config::ProcessorConfig;
use crate::domain::Message;
use crate::error::{PollqError, Result};
use crate::observability::RunnerStatus;
use crate::ports::{MessageHandler, QueueStore};

/// What happened to the messages of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub received: usize,
    pub deleted: usize,
    pub retained: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Deleted,
    Retained,
}

/// The per-cycle work of a processor: receive and dispatch one batch.
pub struct PollCycle<H> {
    store: Arc<dyn QueueStore>,
    handler: H,
    queue_name: String,
    max_messages: usize,
    task_name: String,
}

impl<H: MessageHandler> PollCycle<H> {
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Receive one batch and settle every message in it.
    pub async fn poll_once(&self) -> Result<CycleReport> {
        let batch = self
            .store
            .receive_messages(&self.queue_name, self.max_messages)
            .await?;

        let mut report = CycleReport {
            received: batch.len(),
            ..CycleReport::default()
        };
        if batch.is_empty() {
            debug!(queue = %self.queue_name, "no messages");
            return Ok(report);
        }

        let outcomes = join_all(batch.iter().map(|message| self.dispatch(message))).await;

        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(Disposition::Deleted) => report.deleted += 1,
                Ok(Disposition::Retained) => report.retained += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(queue = %self.queue_name, error = %err, "message dispatch failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        info!(
            queue = %self.queue_name,
            received = report.received,
            deleted = report.deleted,
            retained = report.retained,
            failed = report.failed,
            "poll cycle complete"
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    async fn dispatch(&self, message: &Message) -> Result<Disposition> {
        let message_id = message.id;
        let handled = AssertUnwindSafe(self.handler.handle(message))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err("handler panicked".into()));

        match handled {
            Ok(true) => {
                self.store.delete_message(&self.queue_name, message_id).await?;
                debug!(queue = %self.queue_name, message_id = %message_id, "message processed");
                Ok(Disposition::Deleted)
            }
            Ok(false) => {
                debug!(
                    queue = %self.queue_name,
                    message_id = %message_id,
                    receive_count = message.approximate_receive_count,
                    "handler declined message, leaving it for redelivery"
                );
                Ok(Disposition::Retained)
            }
            Err(source) => Err(PollqError::Handler { message_id, source }),
        }
    }
}

#[async_trait]
impl<H: MessageHandler + 'static> BackgroundWork for PollCycle<H> {
    fn name(&self) -> &str {
        &self.task_name
    }

    async fn run_once(&self) -> Result<()> {
        self.poll_once().await.map(|_| ())
    }
}

/// Continuously drains one named queue.
///
/// ```ignore
/// let processor = QueueProcessor::new(
///     store,
///     ProcessorConfig::new("emails").with_max_messages(10),
///     handler_fn(|message: Message| async move { send_email(&message.body).await }),
/// )?;
/// processor.start();
/// ```
pub struct QueueProcessor<H> {
    runner: BackgroundRunner<PollCycle<H>>,
}

impl<H: MessageHandler + 'static> QueueProcessor<H> {
    /// Build a processor. Fails if `config` is unusable.
    pub fn new(store: Arc<dyn QueueStore>, config: ProcessorConfig, handler: H) -> Result<Self> {
        config.validate()?;
        let cycle = PollCycle {
            store,
            handler,
            task_name: format!("queue-processor:{}", config.queue_name),
            queue_name: config.queue_name.clone(),
            max_messages: config.max_messages_per_receive,
        };
        Ok(Self {
            runner: BackgroundRunner::new(cycle, config.runner_config()),
        })
    }

    pub fn queue_name(&self) -> &str {
        self.runner.work().queue_name()
    }

    pub fn handler(&self) -> &H {
        self.runner.work().handler()
    }

    /// Start polling in the background. Returns `false` if already running.
    pub fn start(&self) -> bool {
        let started = self.runner.start();
        if started {
            info!(queue = self.queue_name(), "queue processor started");
        }
        started
    }

    /// Stop polling. Returns immediately; in-flight work is abandoned.
    pub fn stop(&self) {
        self.runner.stop();
    }

    pub async fn stop_and_join(&self) {
        self.runner.stop_and_join().await;
        info!(queue = self.queue_name(), "queue processor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    pub fn status(&self) -> RunnerStatus {
        self.runner.status()
    }

    /// Run one cycle inline, outside the background loop.
    ///
    /// Meant for one-shot draining and tests; calling it while the
    /// processor is started overlaps receives from the same instance.
    pub async fn poll_once(&self) -> Result<CycleReport> {
        self.runner.work().poll_once().await
    }
}
