//! Configuration for background runners and queue processors.
//!
//! Config structs are plain serde values with defaults, so they can be read
//! from JSON, environment variables (see the CLI), or built in code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::queue::ceil_secs;
use crate::error::{PollqError, Result};

pub const DEFAULT_ERROR_THRESHOLD: u32 = 15;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_POLL_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MAX_MESSAGES_PER_RECEIVE: usize = 1;

/// Cadence and circuit-breaker settings for a `BackgroundRunner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Target time between the starts of two successful cycles.
    pub interval: Duration,

    /// Consecutive failures tolerated before cooling down.
    /// The cool-down starts when the count goes *above* this value.
    pub error_threshold: u32,

    /// How long to back off once the threshold is exceeded.
    pub cooldown: Duration,
}

impl RunnerConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Settings for a `QueueProcessor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub queue_name: String,
    pub max_messages_per_receive: usize,
    pub poll_delay_ms: u64,
    pub error_threshold: u32,
    pub cooldown_secs: u64,
}

impl ProcessorConfig {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_messages(mut self, max_messages_per_receive: usize) -> Self {
        self.max_messages_per_receive = max_messages_per_receive;
        self
    }

    pub fn with_poll_delay(mut self, poll_delay: Duration) -> Self {
        self.poll_delay_ms = u64::try_from(poll_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_cooldown(mut self, threshold: u32, cooldown: Duration) -> Self {
        self.error_threshold = threshold;
        self.cooldown_secs = ceil_secs(cooldown);
        self
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            interval: self.poll_delay(),
            error_threshold: self.error_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }

    /// Reject settings a processor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_name.trim().is_empty() {
            return Err(PollqError::InvalidConfig("queue_name must not be empty".into()));
        }
        if self.max_messages_per_receive == 0 {
            return Err(PollqError::InvalidConfig(
                "max_messages_per_receive must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queue_name: String::new(),
            max_messages_per_receive: DEFAULT_MAX_MESSAGES_PER_RECEIVE,
            poll_delay_ms: DEFAULT_POLL_DELAY_MS,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
        }
    }
}
