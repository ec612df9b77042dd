//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scheduler (attempts, queue depth, in-flight work, dedup, recovery)
//! - Triage backend (LLM token usage)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Triage attempts total by outcome.
pub static TRIAGE_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_attempts_total", "Total triage attempts"),
        &["outcome"], // "triaged", "failed", "skipped", "store_unavailable"
    )
    .unwrap()
});

/// Triage attempt duration in seconds.
pub static TRIAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "triage_attempt_duration_seconds",
            "Duration of triage attempts",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Enqueue calls ignored because the ID was already queued.
pub static ENQUEUE_DEDUPLICATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "triage_enqueue_deduplicated_total",
        "Enqueue calls ignored because the ticket was already queued",
    )
    .unwrap()
});

/// Tickets re-enqueued by startup recovery.
pub static TICKETS_RECOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "triage_tickets_recovered_total",
        "Pending tickets re-enqueued at startup",
    )
    .unwrap()
});

/// Ticket IDs waiting to be dispatched.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("triage_queue_depth", "Ticket IDs waiting to be dispatched").unwrap()
});

/// Triage attempts currently running.
pub static IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("triage_in_flight", "Triage attempts currently running").unwrap()
});

// =============================================================================
// Triage Backend Metrics
// =============================================================================

/// LLM token usage.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "type"], // type: "input", "output"
    )
    .unwrap()
});

/// All core metrics, for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Scheduler
        Box::new(TRIAGE_ATTEMPTS.clone()),
        Box::new(TRIAGE_DURATION.clone()),
        Box::new(ENQUEUE_DEDUPLICATED.clone()),
        Box::new(TICKETS_RECOVERED.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(IN_FLIGHT.clone()),
        // Triage backend
        Box::new(LLM_TOKENS.clone()),
    ]
}
