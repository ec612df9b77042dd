//! Support tickets: types, status rules and storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTicketStore;
pub use store::{TicketError, TicketFilter, TicketStore};
pub use types::{
    NewTicket, Ticket, TicketCategory, TicketStatus, TicketUrgency, Transition, TriageResult,
};
