//! Message record: one unit of work held by a queue store.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::MessageId;

/// Where a message stands relative to `now`.
///
/// Never stored. Stores compute it from timestamps at query time so that
/// re-visibility after a timeout needs no write.
///
/// Transitions:
/// - Pending -> Visible (once `approximate_first_receive_at <= now`)
/// - Visible -> InFlight (receive stamps `last_access_at`)
/// - InFlight -> Visible (visibility timeout elapses)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageVisibility {
    /// Delivery delay not yet elapsed.
    Pending,

    /// Eligible for the next receive.
    Visible,

    /// Handed to a receiver and still inside the visibility window.
    InFlight,
}

/// A message as stored and as handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,

    /// Opaque payload. Only handlers interpret it.
    pub body: String,

    pub queue_name: String,

    /// Set once at send.
    pub sent_at: DateTime<Utc>,

    /// `sent_at + delay`; the earliest instant the message can be received.
    pub approximate_first_receive_at: DateTime<Utc>,

    /// Stamped every time the message is handed to a receiver.
    pub last_access_at: Option<DateTime<Utc>>,

    /// Incremented every time the message is handed to a receiver.
    pub approximate_receive_count: u32,
}

impl Message {
    pub fn new(
        id: MessageId,
        queue_name: impl Into<String>,
        body: impl Into<String>,
        sent_at: DateTime<Utc>,
        delay: Duration,
    ) -> Self {
        Self {
            id,
            body: body.into(),
            queue_name: queue_name.into(),
            sent_at,
            approximate_first_receive_at: sent_at
                .checked_add_signed(to_time_delta(delay))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            last_access_at: None,
            approximate_receive_count: 0,
        }
    }

    pub fn visibility(&self, now: DateTime<Utc>, visibility_timeout: Duration) -> MessageVisibility {
        if now < self.approximate_first_receive_at {
            return MessageVisibility::Pending;
        }
        match self.last_access_at {
            Some(accessed) if now - accessed < to_time_delta(visibility_timeout) => {
                MessageVisibility::InFlight
            }
            _ => MessageVisibility::Visible,
        }
    }

    pub fn is_receivable(&self, now: DateTime<Utc>, visibility_timeout: Duration) -> bool {
        self.visibility(now, visibility_timeout) == MessageVisibility::Visible
    }

    /// Hand the message to a receiver.
    pub fn mark_received(&mut self, now: DateTime<Utc>) {
        self.last_access_at = Some(now);
        self.approximate_receive_count = self.approximate_receive_count.saturating_add(1);
    }

    /// Decode the body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Saturating conversion; delays past chrono's range behave as "never".
pub(crate) fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
