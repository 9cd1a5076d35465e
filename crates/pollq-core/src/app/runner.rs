//! BackgroundRunner - fixed-cadence loop with error-rate-limited backoff.
//!
//! # Loop
//! 1. `next_run = now + interval`
//! 2. run one cycle
//! 3. success: reset the error count, sleep until `next_run`
//! 4. failure: count it; above the threshold, reset and cool down,
//!    otherwise start the next cycle straight away
//!
//! Work time counts against the interval (cadence between cycle starts,
//! not a pause after each cycle). Cancellation interrupts the cycle and any
//! sleep and is never counted as an error.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::observability::RunnerStatus;

/// One repeatable unit of background work.
#[async_trait]
pub trait BackgroundWork: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run a single cycle.
    async fn run_once(&self) -> Result<()>;
}

/// Counters shared between the worker task and the controller.
#[derive(Debug, Default)]
struct RunnerCounters {
    iterations: AtomicU64,
    consecutive_errors: AtomicU32,
    cooldowns: AtomicU64,
}

struct ActiveWorker {
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// Start/stop controller around a dedicated worker task.
///
/// - `start` spawns the worker unless one is already running.
/// - `stop` signals cancellation and returns immediately.
/// - `stop_and_join` also waits for the worker to unwind.
///
/// `start` must be called from within a Tokio runtime.
pub struct BackgroundRunner<W> {
    work: Arc<W>,
    config: RunnerConfig,
    counters: Arc<RunnerCounters>,
    active: Mutex<Option<ActiveWorker>>,
}

impl<W: BackgroundWork> BackgroundRunner<W> {
    pub fn new(work: W, config: RunnerConfig) -> Self {
        Self::from_arc(Arc::new(work), config)
    }

    pub fn from_arc(work: Arc<W>, config: RunnerConfig) -> Self {
        Self {
            work,
            config,
            counters: Arc::new(RunnerCounters::default()),
            active: Mutex::new(None),
        }
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Launch the worker. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|worker| !worker.join.is_finished()) {
            debug!(task = self.work.name(), "start ignored: already running");
            return false;
        }

        let token = CancellationToken::new();
        let join = tokio::spawn(run_loop(
            Arc::clone(&self.work),
            self.config,
            Arc::clone(&self.counters),
            token.clone(),
        ));
        *active = Some(ActiveWorker { token, join });
        true
    }

    /// Signal the worker to stop. No-op when not running.
    pub fn stop(&self) {
        if let Some(worker) = self.lock_active().take() {
            worker.token.cancel();
            debug!(task = self.work.name(), "stop requested");
        }
    }

    /// Signal the worker to stop and wait until it has exited.
    pub async fn stop_and_join(&self) {
        let worker = self.lock_active().take();
        let Some(worker) = worker else {
            return;
        };
        worker.token.cancel();
        if let Err(err) = worker.join.await {
            error!(task = self.work.name(), error = %err, "background worker ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|worker| !worker.join.is_finished())
    }

    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            running: self.is_running(),
            iterations: self.counters.iterations.load(Ordering::Relaxed),
            consecutive_errors: self.counters.consecutive_errors.load(Ordering::Relaxed),
            cooldowns: self.counters.cooldowns.load(Ordering::Relaxed),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveWorker>> {
        // Only an Option is guarded; recover it if a holder panicked.
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W> Drop for BackgroundRunner<W> {
    fn drop(&mut self) {
        let active = self
            .active
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(worker) = active.take() {
            worker.token.cancel();
        }
    }
}

async fn run_loop<W: BackgroundWork>(
    work: Arc<W>,
    config: RunnerConfig,
    counters: Arc<RunnerCounters>,
    token: CancellationToken,
) {
    let name = work.name();
    info!(
        task = name,
        interval_ms = config.interval.as_millis() as u64,
        error_threshold = config.error_threshold,
        "background task started"
    );

    loop {
        let next_run = Instant::now() + config.interval;
        counters.iterations.fetch_add(1, Ordering::Relaxed);

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = work.run_once() => result,
        };

        match result {
            Ok(()) => {
                counters.consecutive_errors.store(0, Ordering::Relaxed);
                if !sleep_until(next_run, &token).await {
                    break;
                }
            }
            Err(err) => {
                let errors = counters.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
                if errors > config.error_threshold {
                    counters.consecutive_errors.store(0, Ordering::Relaxed);
                    counters.cooldowns.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        task = name,
                        error = %err,
                        consecutive_errors = errors,
                        cooldown_secs = config.cooldown.as_secs(),
                        "error threshold exceeded, cooling down"
                    );
                    if !sleep_until(Instant::now() + config.cooldown, &token).await {
                        break;
                    }
                } else {
                    warn!(task = name, error = %err, consecutive_errors = errors, "background cycle failed");
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    info!(task = name, "background task stopped");
}

/// Sleep until `deadline`. Returns `false` if cancelled first.
async fn sleep_until(deadline: Instant, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep_until(deadline) => true,
    }
}
