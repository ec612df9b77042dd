//! Mock triager for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ticket::{TicketCategory, TicketUrgency, TriageResult};
use crate::triage::{TriageError, TriageInput, Triager};

/// Tracks how many calls are running at once.
#[derive(Debug, Default)]
struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrements the running count when the call ends, including when the
/// call's future is dropped by a timeout.
struct RunningCall<'a>(&'a ConcurrencyTracker);

impl<'a> RunningCall<'a> {
    fn enter(tracker: &'a ConcurrencyTracker) -> Self {
        let now = tracker.current.fetch_add(1, Ordering::SeqCst) + 1;
        tracker.peak.fetch_max(now, Ordering::SeqCst);
        Self(tracker)
    }
}

impl Drop for RunningCall<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the Triager trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable result or error
/// - Simulate slow backends with a delay
/// - Panic on a chosen subject
/// - Record inputs and measure peak concurrency
///
/// # Example
///
/// ```rust,ignore
/// use triage_core::testing::MockTriager;
///
/// let triager = MockTriager::new().with_delay(Duration::from_millis(50));
/// triager.fail_with("rate limited");
///
/// // ... run the scheduler ...
///
/// assert_eq!(triager.call_count(), 3);
/// assert!(triager.peak_concurrency() <= 3);
/// ```
#[derive(Debug)]
pub struct MockTriager {
    /// Outcome for subsequent calls.
    response: Mutex<Result<TriageResult, String>>,
    /// Simulated latency per call.
    delay: Mutex<Option<Duration>>,
    /// Calls whose subject matches panic instead of returning.
    panic_subject: Mutex<Option<String>>,
    /// Recorded inputs.
    calls: Mutex<Vec<TriageInput>>,
    tracker: Arc<ConcurrencyTracker>,
}

impl Default for MockTriager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTriager {
    /// Create a mock that classifies everything as urgent billing.
    pub fn new() -> Self {
        Self {
            response: Mutex::new(Ok(default_result())),
            delay: Mutex::new(None),
            panic_subject: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            tracker: Arc::new(ConcurrencyTracker::default()),
        }
    }

    /// Delay every call by `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Return `result` from subsequent calls.
    pub fn succeed_with(&self, result: TriageResult) {
        *self.response.lock().unwrap() = Ok(result);
    }

    /// Fail subsequent calls with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.response.lock().unwrap() = Err(message.into());
    }

    /// Panic when a ticket with this subject is triaged.
    pub fn panic_on_subject(&self, subject: impl Into<String>) {
        *self.panic_subject.lock().unwrap() = Some(subject.into());
    }

    /// Inputs received so far, in call order.
    pub fn recorded_calls(&self) -> Vec<TriageInput> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.tracker.peak.load(Ordering::SeqCst)
    }

    /// Calls running right now.
    pub fn current_concurrency(&self) -> usize {
        self.tracker.current.load(Ordering::SeqCst)
    }
}

/// The result [`MockTriager::new`] returns.
pub fn default_result() -> TriageResult {
    TriageResult {
        category: TicketCategory::Billing,
        sentiment_score: 3,
        urgency: TicketUrgency::High,
        draft_response: "Thanks for reaching out. We are looking into the charge.".to_string(),
    }
}

#[async_trait]
impl Triager for MockTriager {
    fn name(&self) -> &str {
        "mock"
    }

    async fn triage(&self, input: &TriageInput) -> Result<TriageResult, TriageError> {
        self.calls.lock().unwrap().push(input.clone());
        let _running = RunningCall::enter(&self.tracker);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let panic_subject = self.panic_subject.lock().unwrap().clone();
        if panic_subject.as_deref() == Some(input.subject.as_str()) {
            panic!("mock triager panic for {}", input.subject);
        }

        let response = self.response.lock().unwrap().clone();
        response.map_err(TriageError::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(subject: &str) -> TriageInput {
        TriageInput {
            subject: subject.to_string(),
            message: "body".to_string(),
            requester_name: None,
            requester_email: None,
        }
    }

    #[tokio::test]
    async fn test_default_success_and_recording() {
        let triager = MockTriager::new();
        let result = triager.triage(&input("a")).await.unwrap();
        assert_eq!(result, default_result());
        assert_eq!(triager.call_count(), 1);
        assert_eq!(triager.recorded_calls()[0].subject, "a");
        assert_eq!(triager.peak_concurrency(), 1);
        assert_eq!(triager.current_concurrency(), 0);
    }

    #[tokio::test]
    async fn test_fail_with() {
        let triager = MockTriager::new();
        triager.fail_with("boom");
        let err = triager.triage(&input("a")).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
