//! Timing layer of the watcher.
//!
//! [`TriggerSpec`] answers "how long until the next run" and [`Scheduler`]
//! turns that into spawned runs, at most one in flight at a time.

pub mod scheduler;
pub mod trigger;

pub use scheduler::Scheduler;
pub use trigger::TriggerSpec;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("invalid trigger: {0}")]
	InvalidTrigger(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
