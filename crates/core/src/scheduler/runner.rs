//! Triage scheduler implementation.
//!
//! A FIFO of ticket IDs drained by a single dispatch task that keeps at most
//! `concurrency` attempts in flight:
//! - `enqueue` is synchronous and never blocks; it starts the dispatch task
//!   when none is running.
//! - The dispatch task owns a `JoinSet` of attempts and exits only after
//!   confirming, under the queue lock, that there is nothing left to do.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::ticket::{TicketFilter, TicketStatus, TicketStore, Transition};
use crate::triage::{TriageError, TriageInput, Triager};

use super::config::SchedulerConfig;
use super::types::{AttemptOutcome, RecoveryOutcome, SchedulerStatus, SkipReason};

/// Recorded on a failed ticket when the backend gives no error text.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Queue state shared between `enqueue` callers and the dispatch task.
#[derive(Debug, Default)]
struct QueueState {
    /// IDs in dispatch order.
    pending: VecDeque<String>,
    /// Mirror of `pending` for O(1) dedup.
    queued_ids: HashSet<String>,
    /// A dispatch task is running.
    dispatching: bool,
}

struct SchedulerInner {
    config: SchedulerConfig,
    ticket_store: Arc<dyn TicketStore>,
    triager: Arc<dyn Triager>,
    queue: Mutex<QueueState>,
    in_flight: AtomicUsize,
    recovery_started: AtomicBool,
}

/// Schedules background triage with deduplication and bounded concurrency.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct TriageScheduler {
    inner: Arc<SchedulerInner>,
}

impl TriageScheduler {
    /// Create a new scheduler. Nothing runs until the first `enqueue`.
    pub fn new(
        config: SchedulerConfig,
        ticket_store: Arc<dyn TicketStore>,
        triager: Arc<dyn Triager>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                ticket_store,
                triager,
                queue: Mutex::new(QueueState::default()),
                in_flight: AtomicUsize::new(0),
                recovery_started: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    // The lock is never held across an await or user code, so a poisoned
    // guard still protects consistent data.
    fn queue(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a ticket for triage.
    ///
    /// Returns `false` when the ID is already waiting in the queue. An ID
    /// whose attempt is currently running is not considered queued, so
    /// enqueueing it again schedules a fresh attempt.
    pub fn enqueue(&self, ticket_id: &str) -> bool {
        let start_dispatch = {
            let mut queue = self.queue();
            if !queue.queued_ids.insert(ticket_id.to_string()) {
                metrics::ENQUEUE_DEDUPLICATED.inc();
                debug!(ticket_id, "Ticket already queued, ignoring");
                return false;
            }
            queue.pending.push_back(ticket_id.to_string());
            metrics::QUEUE_DEPTH.set(queue.pending.len() as i64);
            !std::mem::replace(&mut queue.dispatching, true)
        };

        debug!(ticket_id, "Ticket queued for triage");

        if start_dispatch {
            self.spawn_dispatch_loop();
        }
        true
    }

    fn spawn_dispatch_loop(&self) {
        match Handle::try_current() {
            Ok(handle) => {
                let scheduler = self.clone();
                handle.spawn(async move { scheduler.dispatch_loop().await });
            }
            Err(e) => {
                // Work stays queued; the next enqueue inside a runtime starts the loop.
                self.queue().dispatching = false;
                error!(error = %e, "No async runtime available, triage dispatch not started");
            }
        }
    }

    async fn dispatch_loop(self) {
        let limit = self.inner.config.concurrency.max(1);
        let mut attempts: JoinSet<AttemptOutcome> = JoinSet::new();

        debug!(limit, "Triage dispatch loop started");

        loop {
            while attempts.len() < limit {
                let next = {
                    let mut queue = self.queue();
                    let next = queue.pending.pop_front();
                    match &next {
                        Some(id) => {
                            queue.queued_ids.remove(id);
                            metrics::QUEUE_DEPTH.set(queue.pending.len() as i64);
                        }
                        None if attempts.is_empty() => {
                            queue.dispatching = false;
                            debug!("Triage dispatch loop idle, exiting");
                            return;
                        }
                        None => {}
                    }
                    next
                };

                let Some(ticket_id) = next else {
                    break;
                };

                let scheduler = self.clone();
                attempts.spawn(async move { scheduler.run_once(&ticket_id).await });
                self.set_in_flight(attempts.len());
            }

            match attempts.join_next().await {
                Some(Ok(outcome)) => debug!(outcome = outcome.label(), "Triage attempt finished"),
                Some(Err(e)) => error!(error = %e, "Triage attempt aborted"),
                None => {}
            }
            self.set_in_flight(attempts.len());
        }
    }

    fn set_in_flight(&self, count: usize) {
        self.inner.in_flight.store(count, Ordering::SeqCst);
        metrics::IN_FLIGHT.set(count as i64);
    }

    /// Run one triage attempt for a ticket.
    ///
    /// Re-reads the ticket, calls the triager under the configured timeout
    /// and applies the outcome. Never fails; problems are reported in the
    /// returned outcome and logged.
    pub async fn run_once(&self, ticket_id: &str) -> AttemptOutcome {
        let started = Instant::now();
        let outcome = self.attempt(ticket_id).await;

        metrics::TRIAGE_ATTEMPTS
            .with_label_values(&[outcome.label()])
            .inc();
        metrics::TRIAGE_DURATION
            .with_label_values(&[outcome.label()])
            .observe(started.elapsed().as_secs_f64());

        outcome
    }

    async fn attempt(&self, ticket_id: &str) -> AttemptOutcome {
        let store = &self.inner.ticket_store;

        let ticket = match store.get(ticket_id) {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                debug!(ticket_id, "Ticket not found, skipping triage");
                return AttemptOutcome::Skipped(SkipReason::NotFound);
            }
            Err(e) => {
                error!(ticket_id, error = %e, "Failed to load ticket for triage");
                return AttemptOutcome::StoreUnavailable(e.to_string());
            }
        };

        if !ticket.status.accepts_triage_outcome() {
            debug!(ticket_id, status = %ticket.status, "Ticket resolved, skipping triage");
            return AttemptOutcome::Skipped(SkipReason::Resolved);
        }

        let input = TriageInput::from(&ticket);
        let timeout = self.inner.config.triage_timeout();
        let result = match tokio::time::timeout(timeout, self.inner.triager.triage(&input)).await
        {
            Ok(result) => result,
            Err(_) => Err(TriageError::Timeout(timeout)),
        };

        match result {
            Ok(triage) => match store.apply_triage_success(ticket_id, &triage) {
                Ok(Some(Transition::Applied(_))) => {
                    info!(
                        ticket_id,
                        category = triage.category.as_str(),
                        urgency = triage.urgency.as_str(),
                        sentiment = triage.sentiment_score,
                        "Ticket triaged"
                    );
                    AttemptOutcome::Triaged
                }
                Ok(Some(Transition::Refused(current))) => {
                    info!(
                        ticket_id,
                        status = %current.status,
                        "Ticket resolved during triage, result discarded"
                    );
                    AttemptOutcome::Skipped(SkipReason::Resolved)
                }
                Ok(None) => {
                    debug!(ticket_id, "Ticket disappeared during triage");
                    AttemptOutcome::Skipped(SkipReason::NotFound)
                }
                Err(e) => {
                    error!(ticket_id, error = %e, "Failed to store triage result");
                    AttemptOutcome::StoreUnavailable(e.to_string())
                }
            },
            Err(e) => {
                let mut message = e.to_string();
                if message.trim().is_empty() {
                    message = UNKNOWN_ERROR.to_string();
                }
                warn!(
                    ticket_id,
                    triager = self.inner.triager.name(),
                    error = %message,
                    "Triage failed"
                );
                match store.apply_triage_failure(ticket_id, &message) {
                    Ok(()) => AttemptOutcome::Failed(message),
                    Err(e) => {
                        error!(ticket_id, error = %e, "Failed to record triage failure");
                        AttemptOutcome::StoreUnavailable(e.to_string())
                    }
                }
            }
        }
    }

    /// Enqueue every `PENDING` ticket, oldest first.
    ///
    /// Only the first call in the lifetime of the scheduler lists the store;
    /// later calls return [`RecoveryOutcome::AlreadyStarted`].
    pub fn start_recovery(&self) -> RecoveryOutcome {
        if self.inner.recovery_started.swap(true, Ordering::SeqCst) {
            debug!("Triage recovery already started");
            return RecoveryOutcome::AlreadyStarted;
        }

        let filter = TicketFilter::new().with_status(TicketStatus::Pending);
        match self.inner.ticket_store.list(&filter) {
            Ok(tickets) => {
                // Listing is newest first
                let recovered = tickets
                    .iter()
                    .rev()
                    .filter(|ticket| self.enqueue(&ticket.id))
                    .count();

                metrics::TICKETS_RECOVERED.inc_by(recovered as u64);
                info!(recovered, "Recovered pending tickets for triage");
                RecoveryOutcome::Recovered(recovered)
            }
            Err(e) => {
                error!(error = %e, "Failed to list pending tickets for recovery");
                RecoveryOutcome::Failed(e.to_string())
            }
        }
    }

    /// Current scheduler state.
    pub fn status(&self) -> SchedulerStatus {
        let (queued, dispatching) = {
            let queue = self.queue();
            (queue.pending.len(), queue.dispatching)
        };

        SchedulerStatus {
            queued,
            in_flight: self.inner.in_flight.load(Ordering::SeqCst),
            concurrency: self.inner.config.concurrency,
            dispatching,
            recovery_started: self.inner.recovery_started.load(Ordering::SeqCst),
        }
    }
}
