//! Ports - the seams between the processor and the outside world.
//!
//! - `QueueStore`: persistent queue storage (in-memory impl in `impls`)
//! - `MessageHandler`: caller-supplied message processing
//! - `Clock`, `IdGenerator`: injectable time and identity for deterministic tests

pub mod clock;
pub mod handler;
pub mod id_generator;
pub mod queue_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::handler::{FnHandler, MessageHandler, handler_fn};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_store::QueueStore;
