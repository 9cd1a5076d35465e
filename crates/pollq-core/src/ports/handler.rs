//! MessageHandler port - caller-supplied message processing.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::Message;
use crate::error::HandlerError;

/// Processes one message.
///
/// - `Ok(true)`: done, the processor deletes the message.
/// - `Ok(false)`: not done, the message becomes visible again after its
///   visibility timeout.
/// - `Err(_)`: same as `Ok(false)` for the message, and the failure counts
///   against the processor's error budget.
///
/// Delivery is at-least-once, so handlers must tolerate duplicates. Use
/// `Message::approximate_receive_count` to decide when to give up.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<bool, HandlerError>;
}

#[async_trait]
impl<H: MessageHandler + ?Sized> MessageHandler for std::sync::Arc<H> {
    async fn handle(&self, message: &Message) -> Result<bool, HandlerError> {
        (**self).handle(message).await
    }
}

/// Adapter turning an async closure into a `MessageHandler`.
pub struct FnHandler<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// Build a handler from a closure taking an owned `Message`.
///
/// ```ignore
/// let handler = handler_fn(|message: Message| async move {
///     println!("{}", message.body);
///     Ok::<bool, HandlerError>(true)
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, HandlerError>> + Send,
{
    FnHandler {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F, Fut>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, HandlerError>> + Send,
{
    async fn handle(&self, message: &Message) -> Result<bool, HandlerError> {
        (self.f)(message.clone()).await
    }
}
