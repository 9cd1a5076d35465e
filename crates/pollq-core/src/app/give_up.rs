//! GiveUpAfter - bound redelivery from the handler side.
//!
//! The processor never drops a message on its own; it is retried for as
//! long as the handler declines it. Wrapping a handler in `GiveUpAfter`
//! adds the usual policy: once a message has been received more than
//! `max_receives` times, acknowledge it without calling the inner handler
//! so the processor deletes it.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::Message;
use crate::error::HandlerError;
use crate::ports::MessageHandler;

pub const DEFAULT_MAX_RECEIVES: u32 = 5;

pub struct GiveUpAfter<H> {
    inner: H,
    max_receives: u32,
}

impl<H> GiveUpAfter<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            max_receives: DEFAULT_MAX_RECEIVES,
        }
    }

    pub fn with_max_receives(mut self, max_receives: u32) -> Self {
        self.max_receives = max_receives;
        self
    }

    pub fn max_receives(&self) -> u32 {
        self.max_receives
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: MessageHandler> MessageHandler for GiveUpAfter<H> {
    async fn handle(&self, message: &Message) -> Result<bool, HandlerError> {
        if message.approximate_receive_count > self.max_receives {
            warn!(
                queue = %message.queue_name,
                message_id = %message.id,
                receive_count = message.approximate_receive_count,
                max_receives = self.max_receives,
                "giving up on message"
            );
            return Ok(true);
        }
        self.inner.handle(message).await
    }
}
