//! Ticket store wrapper that fails on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ticket::{
    NewTicket, Ticket, TicketError, TicketFilter, TicketStore, Transition, TriageResult,
};

/// Wraps a real store and injects `Database` errors.
///
/// Reads (`get`), listings (`list`, `count`) and writes can be switched to
/// failing independently. Listing calls are counted so tests can assert how
/// often the store was scanned.
pub struct FlakyTicketStore {
    inner: Arc<dyn TicketStore>,
    fail_reads: AtomicBool,
    fail_lists: AtomicBool,
    fail_writes: AtomicBool,
    list_calls: AtomicUsize,
}

impl FlakyTicketStore {
    pub fn new(inner: Arc<dyn TicketStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `list` calls so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), TicketError> {
        if flag.load(Ordering::SeqCst) {
            Err(TicketError::Database(format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

impl TicketStore for FlakyTicketStore {
    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.create(ticket)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.get(id)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_lists, "list")?;
        self.inner.list(filter)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        Self::check(&self.fail_lists, "list")?;
        self.inner.count(filter)
    }

    fn apply_triage_success(
        &self,
        id: &str,
        result: &TriageResult,
    ) -> Result<Option<Transition>, TicketError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.apply_triage_success(id, result)
    }

    fn apply_triage_failure(&self, id: &str, message: &str) -> Result<(), TicketError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.apply_triage_failure(id, message)
    }

    fn mark_pending(&self, id: &str) -> Result<Option<Transition>, TicketError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.mark_pending(id)
    }

    fn update_draft(
        &self,
        id: &str,
        draft_response: &str,
    ) -> Result<Option<Transition>, TicketError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.update_draft(id, draft_response)
    }

    fn resolve(
        &self,
        id: &str,
        draft_response: Option<&str>,
    ) -> Result<Option<Transition>, TicketError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.resolve(id, draft_response)
    }
}
