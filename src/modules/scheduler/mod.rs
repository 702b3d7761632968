//! Background task scheduler
//!
//! Owns a dynamic set of named periodic jobs with start/replace/stop/shutdown
//! semantics. Each task runs on its own tokio task, driven by its own
//! interval timer, and is cancelled through a child of the scheduler's root
//! cancellation token.
pub mod registry;
pub mod task;

pub use registry::{Scheduler, SchedulerConfig};
pub use task::{TaskFn, TaskSnapshot, TaskState};
