//! Ticket API handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use triage_core::{
    NewTicket, RetryOutcome, Ticket, TicketCategory, TicketError, TicketFilter, TicketStatus,
    TicketUpdate, TicketUrgency,
};

use super::handlers::{api_error, ApiError};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

static EMAIL_REGEX: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub subject: String,
    pub message: String,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
}

impl CreateTicketBody {
    /// Trim every field and check it. `None` when the body is invalid.
    fn into_new_ticket(self) -> Option<NewTicket> {
        let subject = self.subject.trim();
        let message = self.message.trim();
        if subject.is_empty() || message.is_empty() {
            return None;
        }

        let requester_name = match self.requester_name.as_deref().map(str::trim) {
            Some("") => return None,
            name => name.map(str::to_string),
        };
        let requester_email = match self.requester_email.as_deref().map(str::trim) {
            Some(email) if !EMAIL_REGEX.is_match(email) => return None,
            email => email.map(str::to_string),
        };

        Some(NewTicket::new(subject, message).with_requester(requester_name, requester_email))
    }
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    /// Filter by status (`PENDING`, `TRIAGED`, `RESOLVED`, `FAILED`)
    pub status: Option<String>,
    /// Maximum number of tickets to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Request body for a manual ticket edit
#[derive(Debug, Deserialize)]
pub struct UpdateTicketBody {
    pub draft_response: Option<String>,
    /// Only `"RESOLVED"` is accepted.
    pub status: Option<String>,
}

/// Ticket as returned by the API
#[derive(Debug, Serialize)]
pub struct TicketResponse {
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
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub resolved_at: Option<String>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            subject: ticket.subject,
            message: ticket.message,
            requester_name: ticket.requester_name,
            requester_email: ticket.requester_email,
            status: ticket.status,
            category: ticket.category,
            sentiment_score: ticket.sentiment_score,
            urgency: ticket.urgency,
            draft_response: ticket.draft_response,
            error: ticket.error,
            created_at: ticket.created_at.to_rfc3339(),
            updated_at: ticket.updated_at.to_rfc3339(),
            resolved_at: ticket.resolved_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Response for listing tickets
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// 409 body for a retry on a ticket that is not `FAILED`
#[derive(Debug, Serialize)]
pub struct NotRetryableResponse {
    pub error: String,
    pub ticket: TicketResponse,
}

fn internal_error(context: &str, e: TicketError) -> ApiError {
    tracing::error!(error = %e, "{}", context);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{}: {}", context, e),
    )
}

fn invalid_body() -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "Invalid request body")
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "Ticket not found")
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a ticket and queue it for triage
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTicketBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let Json(body) = body.map_err(|_| invalid_body())?;
    let new_ticket = body.into_new_ticket().ok_or_else(invalid_body)?;

    let ticket = state
        .service()
        .create_ticket(new_ticket)
        .map_err(|e| internal_error("Failed to create ticket", e))?;

    Ok((StatusCode::CREATED, Json(ticket.into())))
}

/// List tickets, newest first
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListTicketsParams>, QueryRejection>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let Query(params) = params
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid query parameters"))?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new();
    if let Some(status) = params.status.as_deref() {
        let status: TicketStatus = status
            .parse()
            .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid status filter"))?;
        filter = filter.with_status(status);
    }

    let total = state
        .service()
        .count_tickets(&filter)
        .map_err(|e| internal_error("Failed to count tickets", e))?;
    let tickets = state
        .service()
        .list_tickets(&filter.with_limit(limit).with_offset(offset))
        .map_err(|e| internal_error("Failed to list tickets", e))?;

    Ok(Json(ListTicketsResponse {
        tickets: tickets.into_iter().map(TicketResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    match state.service().find_ticket(&id) {
        Ok(Some(ticket)) => Ok(Json(ticket.into())),
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal_error("Failed to get ticket", e)),
    }
}

/// Edit the draft response and/or resolve a ticket
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateTicketBody>, JsonRejection>,
) -> Result<Json<TicketResponse>, ApiError> {
    let Json(body) = body.map_err(|_| invalid_body())?;

    let draft_response = match body.draft_response {
        Some(draft) if draft.is_empty() => return Err(invalid_body()),
        draft => draft,
    };
    let resolve = match body.status.as_deref() {
        None => false,
        Some(status) if status == TicketStatus::Resolved.as_str() => true,
        Some(_) => return Err(invalid_body()),
    };

    let update = TicketUpdate {
        draft_response,
        resolve,
    };
    if update.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "No valid fields to update",
        ));
    }

    tracing::debug!(ticket_id = %id, user = %user, resolve, "Manual ticket update");
    match state.service().update_ticket(&id, update) {
        Ok(Some(ticket)) => Ok(Json(ticket.into())),
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal_error("Failed to update ticket", e)),
    }
}

/// Put a failed ticket back in the triage queue
pub async fn retry_ticket(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Response {
    tracing::debug!(ticket_id = %id, user = %user, "Retry requested");
    match state.service().retry(&id) {
        Ok(RetryOutcome::Requeued(ticket)) => {
            (StatusCode::ACCEPTED, Json(TicketResponse::from(ticket))).into_response()
        }
        Ok(RetryOutcome::NotRetryable(ticket)) => (
            StatusCode::CONFLICT,
            Json(NotRetryableResponse {
                error: "Ticket is not retryable".to_string(),
                ticket: ticket.into(),
            }),
        )
            .into_response(),
        Ok(RetryOutcome::NotFound) => not_found().into_response(),
        Err(e) => internal_error("Failed to retry ticket", e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: Option<&str>, email: Option<&str>) -> CreateTicketBody {
        CreateTicketBody {
            subject: "  Payment failed ".to_string(),
            message: "Card declined\n".to_string(),
            requester_name: name.map(str::to_string),
            requester_email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_create_body_is_trimmed() {
        let ticket = body(Some(" Ari "), Some(" ari@example.com "))
            .into_new_ticket()
            .unwrap();
        assert_eq!(ticket.subject, "Payment failed");
        assert_eq!(ticket.message, "Card declined");
        assert_eq!(ticket.requester_name.as_deref(), Some("Ari"));
        assert_eq!(ticket.requester_email.as_deref(), Some("ari@example.com"));
    }

    #[test]
    fn test_create_body_optional_fields() {
        let ticket = body(None, None).into_new_ticket().unwrap();
        assert!(ticket.requester_name.is_none());
        assert!(ticket.requester_email.is_none());
    }

    #[test]
    fn test_create_body_rejects_blank_fields() {
        let mut blank_subject = body(None, None);
        blank_subject.subject = "   ".to_string();
        assert!(blank_subject.into_new_ticket().is_none());

        assert!(body(Some("  "), None).into_new_ticket().is_none());
    }

    #[test]
    fn test_create_body_rejects_bad_email() {
        for email in ["not-an-email", "a@b", "two words@example.com", ""] {
            assert!(
                body(None, Some(email)).into_new_ticket().is_none(),
                "{}",
                email
            );
        }
    }
}
