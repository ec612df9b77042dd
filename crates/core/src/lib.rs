pub mod auth;
pub mod config;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod testing;
pub mod ticket;
pub mod triage;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, SanitizedConfig,
};
pub use scheduler::{
    AttemptOutcome, RecoveryOutcome, SchedulerConfig, SchedulerStatus, SkipReason,
    TriageScheduler,
};
pub use service::{RetryOutcome, TicketService, TicketUpdate};
pub use ticket::{
    NewTicket, SqliteTicketStore, Ticket, TicketCategory, TicketError, TicketFilter,
    TicketStatus, TicketStore, TicketUrgency, Transition, TriageResult,
};
pub use triage::{create_triager, TriageConfig, TriageError, TriageInput, Triager};
