//! The triage operation contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::llm::LlmError;
use crate::ticket::{Ticket, TriageResult};

/// Errors that can occur during triage.
///
/// The `Display` text is what ends up in a failed ticket's `error` field,
/// so variants carrying a message print it verbatim.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Backend reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The model replied with nothing.
    #[error("Empty AI response")]
    EmptyResponse,

    /// The reply did not match the triage schema.
    #[error("Invalid triage result: {0}")]
    InvalidResult(String),

    /// No triage backend is configured.
    #[error("LLM not configured")]
    NotConfigured,

    /// The call did not finish in time.
    #[error("triage timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// The immutable ticket fields handed to the triage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageInput {
    pub subject: String,
    pub message: String,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
}

impl From<&Ticket> for TriageInput {
    fn from(ticket: &Ticket) -> Self {
        Self {
            subject: ticket.subject.clone(),
            message: ticket.message.clone(),
            requester_name: ticket.requester_name.clone(),
            requester_email: ticket.requester_email.clone(),
        }
    }
}

/// Classifies ticket content.
///
/// Implementations must return a fully valid [`TriageResult`] or an error;
/// partially valid output is an error.
#[async_trait]
pub trait Triager: Send + Sync {
    /// Name of this backend for logging.
    fn name(&self) -> &str;

    async fn triage(&self, input: &TriageInput) -> Result<TriageResult, TriageError>;
}

/// Triager used when no backend is configured. Every call fails.
#[derive(Debug, Default)]
pub struct UnconfiguredTriager;

#[async_trait]
impl Triager for UnconfiguredTriager {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn triage(&self, _input: &TriageInput) -> Result<TriageResult, TriageError> {
        Err(TriageError::NotConfigured)
    }
}
