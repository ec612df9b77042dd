//! Ticket operations exposed to the API layer.
//!
//! Ties the store to the scheduler: creating a ticket queues its triage,
//! retrying a failed ticket re-queues it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::scheduler::TriageScheduler;
use crate::ticket::{NewTicket, Ticket, TicketError, TicketFilter, TicketStore, Transition};

/// A manual edit to a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    /// Replacement draft response.
    pub draft_response: Option<String>,
    /// Move the ticket to `RESOLVED`.
    pub resolve: bool,
}

impl TicketUpdate {
    /// Whether the update asks for anything.
    pub fn is_empty(&self) -> bool {
        self.draft_response.is_none() && !self.resolve
    }
}

/// Result of a retry request.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    NotFound,
    /// The ticket is not `FAILED`; carries its current state.
    NotRetryable(Ticket),
    /// The ticket is back to `PENDING` and queued.
    Requeued(Ticket),
}

/// Ticket use cases.
#[derive(Clone)]
pub struct TicketService {
    ticket_store: Arc<dyn TicketStore>,
    scheduler: TriageScheduler,
}

impl TicketService {
    pub fn new(ticket_store: Arc<dyn TicketStore>, scheduler: TriageScheduler) -> Self {
        Self {
            ticket_store,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &TriageScheduler {
        &self.scheduler
    }

    /// Store a new `PENDING` ticket and queue its triage.
    pub fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, TicketError> {
        let ticket = self.ticket_store.create(ticket)?;
        info!(ticket_id = %ticket.id, subject = %ticket.subject, "Ticket created");
        self.scheduler.enqueue(&ticket.id);
        Ok(ticket)
    }

    /// Put a `FAILED` ticket back to `PENDING` and queue it.
    pub fn retry(&self, id: &str) -> Result<RetryOutcome, TicketError> {
        match self.ticket_store.mark_pending(id)? {
            None => Ok(RetryOutcome::NotFound),
            Some(Transition::Refused(ticket)) => {
                debug!(ticket_id = id, status = %ticket.status, "Retry refused");
                Ok(RetryOutcome::NotRetryable(ticket))
            }
            Some(Transition::Applied(ticket)) => {
                info!(ticket_id = id, "Ticket re-queued for triage");
                self.scheduler.enqueue(&ticket.id);
                Ok(RetryOutcome::Requeued(ticket))
            }
        }
    }

    /// Apply a manual edit.
    ///
    /// Only `PENDING` and `TRIAGED` tickets are editable; for any other
    /// status the ticket is returned unchanged. `None` when not found.
    pub fn update_ticket(
        &self,
        id: &str,
        update: TicketUpdate,
    ) -> Result<Option<Ticket>, TicketError> {
        let transition = if update.resolve {
            self.ticket_store
                .resolve(id, update.draft_response.as_deref())?
        } else if let Some(draft) = update.draft_response.as_deref() {
            self.ticket_store.update_draft(id, draft)?
        } else {
            return self.ticket_store.get(id);
        };

        Ok(transition.map(|transition| {
            match &transition {
                Transition::Applied(ticket) => {
                    info!(ticket_id = id, status = %ticket.status, "Ticket updated")
                }
                Transition::Refused(ticket) => {
                    debug!(ticket_id = id, status = %ticket.status, "Update ignored")
                }
            }
            transition.into_ticket()
        }))
    }

    pub fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        self.ticket_store.get(id)
    }

    /// Tickets matching `filter`, newest first.
    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        self.ticket_store.list(filter)
    }

    pub fn count_tickets(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        self.ticket_store.count(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerConfig;
    use crate::testing::{fixtures, MockTriager};
    use crate::ticket::{SqliteTicketStore, TicketStatus};

    fn service() -> (TicketService, Arc<SqliteTicketStore>) {
        let store = Arc::new(SqliteTicketStore::in_memory().unwrap());
        let scheduler = TriageScheduler::new(
            SchedulerConfig::default(),
            store.clone(),
            Arc::new(MockTriager::new()),
        );
        (TicketService::new(store.clone(), scheduler), store)
    }

    #[tokio::test]
    async fn test_create_ticket_queues_triage() {
        let (service, _) = service();
        let ticket = service.create_ticket(fixtures::new_ticket("Refund")).unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        // Dispatch has not run yet on the current-thread test runtime
        assert_eq!(service.scheduler().status().queued, 1);
    }

    #[tokio::test]
    async fn test_retry_outcomes() {
        let (service, store) = service();
        assert_eq!(service.retry("missing").unwrap(), RetryOutcome::NotFound);

        let ticket = store.create(fixtures::new_ticket("Crash")).unwrap();
        match service.retry(&ticket.id).unwrap() {
            RetryOutcome::NotRetryable(current) => {
                assert_eq!(current.status, TicketStatus::Pending)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        store.apply_triage_failure(&ticket.id, "boom").unwrap();
        match service.retry(&ticket.id).unwrap() {
            RetryOutcome::Requeued(current) => {
                assert_eq!(current.status, TicketStatus::Pending);
                assert!(current.error.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(service.scheduler().status().queued, 1);
    }

    #[tokio::test]
    async fn test_update_ticket_draft_and_resolve() {
        let (service, store) = service();
        let ticket = store.create(fixtures::new_ticket("Billing")).unwrap();

        let updated = service
            .update_ticket(
                &ticket.id,
                TicketUpdate {
                    draft_response: Some("We refunded you.".to_string()),
                    resolve: false,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Pending);
        assert_eq!(updated.draft_response.as_deref(), Some("We refunded you."));

        let resolved = service
            .update_ticket(
                &ticket.id,
                TicketUpdate {
                    draft_response: None,
                    resolve: true,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(resolved.draft_response.as_deref(), Some("We refunded you."));
        assert!(resolved.resolved_at.is_some());

        // Further edits are ignored
        let unchanged = service
            .update_ticket(
                &ticket.id,
                TicketUpdate {
                    draft_response: Some("Changed".to_string()),
                    resolve: false,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, resolved);
    }

    #[tokio::test]
    async fn test_update_failed_ticket_is_noop() {
        let (service, store) = service();
        let ticket = store.create(fixtures::new_ticket("Crash")).unwrap();
        store.apply_triage_failure(&ticket.id, "boom").unwrap();

        let unchanged = service
            .update_ticket(
                &ticket.id,
                TicketUpdate {
                    draft_response: None,
                    resolve: true,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.status, TicketStatus::Failed);
        assert_eq!(unchanged.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_update_missing_ticket() {
        let (service, _) = service();
        let result = service
            .update_ticket("missing", TicketUpdate::default())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_update_is_empty() {
        assert!(TicketUpdate::default().is_empty());
        assert!(!TicketUpdate {
            draft_response: None,
            resolve: true
        }
        .is_empty());
    }
}
