//! Domain model: identifiers, queue descriptors, message records.

pub mod ids;
pub mod message;
pub mod queue;

pub use ids::MessageId;
pub use message::{Message, MessageVisibility};
pub use queue::{QueueDescriptor, QueueSettings};
