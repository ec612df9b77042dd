//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use triage_core::{AuthError, AuthRequest, Identity};

use super::handlers::{api_error, ApiError};
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that validates requests using the configured authenticator.
///
/// On success the resulting [`Identity`] is stored in the request extensions.
/// Failures are answered with 401 and the error text as `{"error": ...}`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_request = request
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .fold(AuthRequest::new(), |auth_request, (name, value)| {
            auth_request.with_header(name, value)
        });

    match state.authenticator().authenticate(&auth_request).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(e @ AuthError::MissingKey) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["missing_key"]).inc();
            Err(api_error(StatusCode::UNAUTHORIZED, e.to_string()))
        }
        Err(e @ AuthError::InvalidKey) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["invalid_key"]).inc();
            Err(api_error(StatusCode::UNAUTHORIZED, e.to_string()))
        }
        Err(e) => {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["internal_error"])
                .inc();
            tracing::error!(error = %e, "Authentication failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Extractor for the authenticated subject.
///
/// Falls back to "anonymous" if no identity is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let subject = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.subject.clone())
            .unwrap_or_else(|| Identity::anonymous().subject);
        std::future::ready(Ok(AuthUser(subject)))
    }
}
