//! Concurrency scheduler for the intent execution engine.
//!
//! Consumes `ChainExecutionJob`s from an inbound queue and dispatches them
//! through the executor registry with one-per-chain exclusivity, bounded
//! global parallelism, and capped exponential retry backoff.

use thiserror::Error;

pub mod backoff;
pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerHandle};

#[derive(Debug, Error)]
pub enum SchedulerError {
	/// The scheduler's intake channel is closed.
	#[error("Job queue closed")]
	QueueClosed,
}
