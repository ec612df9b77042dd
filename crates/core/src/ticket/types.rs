//! Ticket types and the status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket.
///
/// ```text
/// PENDING ──triage ok──▶ TRIAGED ──resolve──▶ RESOLVED
///    │  ▲                                        ▲
///    │  └──────retry──── FAILED                  │
///    └──triage error──▶ FAILED     PENDING ──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Created (or retried) and waiting for triage.
    Pending,
    /// Classified successfully.
    Triaged,
    /// Closed by a human. Frozen.
    Resolved,
    /// Triage failed; can be retried.
    Failed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Pending,
        TicketStatus::Triaged,
        TicketStatus::Resolved,
        TicketStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "PENDING",
            TicketStatus::Triaged => "TRIAGED",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Failed => "FAILED",
        }
    }

    /// Whether a triage outcome (success or failure) may be written.
    pub fn accepts_triage_outcome(&self) -> bool {
        !matches!(self, TicketStatus::Resolved)
    }

    /// Whether the retry action may move this ticket back to pending.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TicketStatus::Failed)
    }

    /// Whether a human may edit the draft or resolve the ticket.
    pub fn accepts_manual_update(&self) -> bool {
        matches!(self, TicketStatus::Pending | TicketStatus::Triaged)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TicketStatus::Pending),
            "TRIAGED" => Ok(TicketStatus::Triaged),
            "RESOLVED" => Ok(TicketStatus::Resolved),
            "FAILED" => Ok(TicketStatus::Failed),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// Category assigned by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    Billing,
    Technical,
    FeatureRequest,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Billing => "BILLING",
            TicketCategory::Technical => "TECHNICAL",
            TicketCategory::FeatureRequest => "FEATURE_REQUEST",
        }
    }
}

impl FromStr for TicketCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BILLING" => Ok(TicketCategory::Billing),
            "TECHNICAL" => Ok(TicketCategory::Technical),
            "FEATURE_REQUEST" => Ok(TicketCategory::FeatureRequest),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Urgency assigned by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketUrgency {
    High,
    Medium,
    Low,
}

impl TicketUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketUrgency::High => "HIGH",
            TicketUrgency::Medium => "MEDIUM",
            TicketUrgency::Low => "LOW",
        }
    }
}

impl FromStr for TicketUrgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(TicketUrgency::High),
            "MEDIUM" => Ok(TicketUrgency::Medium),
            "LOW" => Ok(TicketUrgency::Low),
            other => Err(format!("unknown urgency: {}", other)),
        }
    }
}

/// Classification produced by a successful triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub category: TicketCategory,
    /// 1 (very negative) to 10 (very positive).
    pub sentiment_score: u8,
    pub urgency: TicketUrgency,
    pub draft_response: String,
}

/// A support ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub message: String,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub status: TicketStatus,
    pub category: Option<TicketCategory>,
    pub sentiment_score: Option<u8>,
    pub urgency: Option<TicketUrgency>,
    pub draft_response: Option<String>,
    /// Last triage failure message.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Input for creating a ticket. Always starts as [`TicketStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub subject: String,
    pub message: String,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
}

impl NewTicket {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            requester_name: None,
            requester_email: None,
        }
    }

    pub fn with_requester(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.requester_name = name;
        self.requester_email = email;
        self
    }
}

/// Result of a guarded status transition.
///
/// Store operations that can be refused by the state machine return this
/// wrapped in `Option`, where `None` means the ticket does not exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The transition was written; holds the updated ticket.
    Applied(Ticket),
    /// The current status does not allow it; holds the unchanged ticket.
    Refused(Ticket),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn ticket(&self) -> &Ticket {
        match self {
            Transition::Applied(t) | Transition::Refused(t) => t,
        }
    }

    pub fn into_ticket(self) -> Ticket {
        match self {
            Transition::Applied(t) | Transition::Refused(t) => t,
        }
    }
}
