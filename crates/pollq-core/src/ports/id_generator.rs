//! IdGenerator port - message ID generation.

use ulid::Ulid;

use crate::domain::MessageId;
use crate::ports::Clock;

/// IdGenerator produces message IDs that are unique across nodes.
pub trait IdGenerator: Send + Sync {
    fn generate_message_id(&self) -> MessageId;
}

/// ULID-based generator.
///
/// The timestamp part comes from the injected clock, the remaining 80 bits
/// are random, so a `FixedClock` yields IDs with identical timestamps that
/// are still unique.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_message_id(&self) -> MessageId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        MessageId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
