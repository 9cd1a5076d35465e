//! Queue descriptor and creation settings.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DELAY_SECONDS: u64 = 0;
pub const DEFAULT_RETENTION_SECONDS: u64 = 1_209_600;
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u64 = 90;

/// Tunables supplied when a queue is created.
///
/// All values are whole seconds, matching what the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Delivery delay applied to messages sent without an explicit delay.
    pub delay_seconds: u64,

    /// Advisory retention window. Stores may purge beyond it; nothing here enforces it.
    pub message_retention_period_seconds: u64,

    /// How long a received-but-undeleted message stays hidden.
    pub visibility_timeout_seconds: u64,
}

/// Whole seconds covering `duration`; any fraction rounds up.
pub fn ceil_secs(duration: Duration) -> u64 {
    let partial = u64::from(duration.subsec_nanos() > 0);
    duration.as_secs().saturating_add(partial)
}

impl QueueSettings {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_seconds = ceil_secs(delay);
        self
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout_seconds = ceil_secs(timeout);
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.message_retention_period_seconds = ceil_secs(retention);
        self
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            delay_seconds: DEFAULT_DELAY_SECONDS,
            message_retention_period_seconds: DEFAULT_RETENTION_SECONDS,
            visibility_timeout_seconds: DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
        }
    }
}

/// A named queue as known by the store.
///
/// `name` is unique across a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    pub name: String,
    pub delay_seconds: u64,
    pub message_retention_period_seconds: u64,
    pub visibility_timeout_seconds: u64,
    pub created_at: DateTime<Utc>,
}

impl QueueDescriptor {
    pub fn new(name: impl Into<String>, settings: QueueSettings, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            delay_seconds: settings.delay_seconds,
            message_retention_period_seconds: settings.message_retention_period_seconds,
            visibility_timeout_seconds: settings.visibility_timeout_seconds,
            created_at,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.message_retention_period_seconds)
    }

    pub fn settings(&self) -> QueueSettings {
        QueueSettings {
            delay_seconds: self.delay_seconds,
            message_retention_period_seconds: self.message_retention_period_seconds,
            visibility_timeout_seconds: self.visibility_timeout_seconds,
        }
    }
}
