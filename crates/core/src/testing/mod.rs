//! Testing utilities and mock implementations.
//!
//! Mock collaborators for the scheduler and service, so tests run without a
//! real LLM or a misbehaving database.
//!
//! # Example
//!
//! ```rust,ignore
//! use triage_core::testing::{FlakyTicketStore, MockTriager};
//!
//! let store = Arc::new(SqliteTicketStore::in_memory()?);
//! let flaky = Arc::new(FlakyTicketStore::new(store.clone()));
//! let triager = Arc::new(MockTriager::new());
//!
//! flaky.fail_writes(true);
//! triager.fail_with("upstream unavailable");
//! ```

mod flaky_store;
mod mock_triager;

pub use flaky_store::FlakyTicketStore;
pub use mock_triager::{default_result, MockTriager};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::ticket::{NewTicket, TicketCategory, TicketUrgency, TriageResult};

    /// A ticket with the given subject and a generic message.
    pub fn new_ticket(subject: &str) -> NewTicket {
        NewTicket::new(subject, format!("Details about {}", subject.to_lowercase()))
    }

    /// A ticket with requester details filled in.
    pub fn new_ticket_from(subject: &str, name: &str, email: &str) -> NewTicket {
        new_ticket(subject).with_requester(Some(name.to_string()), Some(email.to_string()))
    }

    /// A technical, low-urgency classification.
    pub fn technical_result(draft: &str) -> TriageResult {
        TriageResult {
            category: TicketCategory::Technical,
            sentiment_score: 6,
            urgency: TicketUrgency::Low,
            draft_response: draft.to_string(),
        }
    }
}
