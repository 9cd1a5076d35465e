use serde::{Deserialize, Serialize};

use crate::domain::MessageVisibility;

/// Messages of one queue grouped by their derived visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub visible: usize,
    pub in_flight: usize,
}

impl QueueCounts {
    pub fn record(&mut self, visibility: MessageVisibility) {
        match visibility {
            MessageVisibility::Pending => self.pending += 1,
            MessageVisibility::Visible => self.visible += 1,
            MessageVisibility::InFlight => self.in_flight += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.visible + self.in_flight
    }
}

/// Snapshot of a background runner, readable from any thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerStatus {
    pub running: bool,

    /// Cycles started since creation.
    pub iterations: u64,

    /// Failed cycles since the last success or cool-down.
    pub consecutive_errors: u32,

    /// Cool-downs entered since creation.
    pub cooldowns: u64,
}
