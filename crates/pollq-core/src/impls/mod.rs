//! Port implementations.
//!
//! - **InMemoryQueueStore**: reference `QueueStore` for tests, demos and
//!   single-process deployments. Durable stores live outside this crate and
//!   implement the same trait.

pub mod memory_store;

pub use self::memory_store::InMemoryQueueStore;
