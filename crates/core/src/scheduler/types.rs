//! Types for the triage scheduler.

use serde::{Deserialize, Serialize};

/// Why an attempt did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The ticket no longer exists.
    NotFound,
    /// The ticket was resolved, before or during the attempt.
    Resolved,
}

/// Result of a single triage attempt.
///
/// Attempts never return errors; every failure mode is an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Classification stored, ticket is `TRIAGED`.
    Triaged,
    /// Triage failed and the ticket is `FAILED` with this message.
    Failed(String),
    /// Nothing to do.
    Skipped(SkipReason),
    /// The store could not be read or written. The ticket is left as it was.
    StoreUnavailable(String),
}

impl AttemptOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Triaged => "triaged",
            AttemptOutcome::Failed(_) => "failed",
            AttemptOutcome::Skipped(_) => "skipped",
            AttemptOutcome::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// Result of the startup recovery scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Recovery already ran in this process; nothing was listed.
    AlreadyStarted,
    /// This many pending tickets were enqueued.
    Recovered(usize),
    /// Listing pending tickets failed. Not retried.
    Failed(String),
}

/// Snapshot of the scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// IDs waiting to be dispatched.
    pub queued: usize,
    /// Attempts currently running.
    pub in_flight: usize,
    /// Concurrency limit.
    pub concurrency: usize,
    /// Whether the dispatch loop is active.
    pub dispatching: bool,
    /// Whether startup recovery has been triggered.
    pub recovery_started: bool,
}

impl SchedulerStatus {
    /// No queued work, nothing running, and the loop has exited.
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.in_flight == 0 && !self.dispatching
    }
}
