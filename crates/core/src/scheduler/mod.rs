//! Background triage scheduling.
//!
//! - **Queue**: FIFO of ticket IDs, deduplicated while waiting
//! - **Dispatch**: one task, at most `concurrency` attempts in flight
//! - **Recovery**: one-shot startup scan that re-enqueues `PENDING` tickets

mod config;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use runner::TriageScheduler;
pub use types::{AttemptOutcome, RecoveryOutcome, SchedulerStatus, SkipReason};
