//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the triage scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum triage attempts running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Upper bound on a single triage call (seconds).
    /// An attempt that exceeds it is recorded as failed.
    #[serde(default = "default_triage_timeout")]
    pub triage_timeout_secs: u64,

    /// Re-enqueue tickets left `PENDING` by a previous run at startup.
    #[serde(default = "default_recover_on_start")]
    pub recover_on_start: bool,
}

fn default_concurrency() -> usize {
    3
}

fn default_triage_timeout() -> u64 {
    60
}

fn default_recover_on_start() -> bool {
    true
}

impl SchedulerConfig {
    pub fn triage_timeout(&self) -> Duration {
        Duration::from_secs(self.triage_timeout_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            triage_timeout_secs: default_triage_timeout(),
            recover_on_start: default_recover_on_start(),
        }
    }
}
