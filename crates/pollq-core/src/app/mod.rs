//! App - background execution on top of the ports.
//!
//! - **BackgroundRunner**: start/stop, fixed cadence, circuit-breaker backoff
//! - **IntervalTask**: a closure on a runner
//! - **QueueProcessor**: receive -> dispatch -> delete, on a runner
//! - **GiveUpAfter**: handler decorator bounding redelivery

pub mod give_up;
pub mod interval;
pub mod processor;
pub mod runner;

pub use self::give_up::GiveUpAfter;
pub use self::interval::{FnWork, IntervalTask, interval_task};
pub use self::processor::{CycleReport, PollCycle, QueueProcessor};
pub use self::runner::{BackgroundRunner, BackgroundWork};
