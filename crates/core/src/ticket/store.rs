//! Ticket storage trait and types.

use thiserror::Error;

use crate::ticket::{NewTicket, Ticket, TicketStatus, Transition, TriageResult};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket not found.
    #[error("Ticket not found: {0}")]
    NotFound(String),
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by status.
    pub status: Option<TicketStatus>,
    /// Maximum number of results (None = unbounded).
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create an unbounded filter matching every ticket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by status.
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for ticket storage backends.
///
/// Transition methods apply the status rules atomically: the status check
/// and the write happen under the same lock, so a ticket resolved by a human
/// can never be overwritten by a late triage outcome.
pub trait TicketStore: Send + Sync {
    /// Insert a new `PENDING` ticket.
    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter, newest first.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (limit/offset ignored).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// `PENDING | TRIAGED | FAILED -> TRIAGED`, writing the classification and
    /// clearing `error`. Refused when `RESOLVED`.
    fn apply_triage_success(
        &self,
        id: &str,
        result: &TriageResult,
    ) -> Result<Option<Transition>, TicketError>;

    /// `* -> FAILED` (except `RESOLVED`), recording `message`. Classification
    /// fields are left untouched.
    fn apply_triage_failure(&self, id: &str, message: &str) -> Result<(), TicketError>;

    /// `FAILED -> PENDING`, clearing `error`. Refused for any other status.
    fn mark_pending(&self, id: &str) -> Result<Option<Transition>, TicketError>;

    /// Replace the draft response while `PENDING | TRIAGED`.
    fn update_draft(&self, id: &str, draft_response: &str)
        -> Result<Option<Transition>, TicketError>;

    /// `PENDING | TRIAGED -> RESOLVED`, stamping `resolved_at` and optionally
    /// overwriting the draft response.
    fn resolve(
        &self,
        id: &str,
        draft_response: Option<&str>,
    ) -> Result<Option<Transition>, TicketError>;
}
