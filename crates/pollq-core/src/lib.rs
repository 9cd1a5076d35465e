//! pollq-core
//!
//! Polling work queue with at-least-once delivery.
//!
//! # Modules
//! - **domain**: messages, queue descriptors, IDs
//! - **ports**: `QueueStore`, `MessageHandler`, `Clock`, `IdGenerator`
//! - **impls**: `InMemoryQueueStore`
//! - **app**: `BackgroundRunner`, `IntervalTask`, `QueueProcessor`, `GiveUpAfter`
//! - **config**, **error**, **observability**, **telemetry**: ambient plumbing

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod telemetry;

pub use app::{BackgroundRunner, BackgroundWork, GiveUpAfter, QueueProcessor};
pub use config::{ProcessorConfig, RunnerConfig};
pub use domain::{Message, MessageId, QueueDescriptor, QueueSettings};
pub use error::{HandlerError, PollqError, Result, StoreError};
pub use impls::InMemoryQueueStore;
pub use ports::{MessageHandler, QueueStore, handler_fn};
