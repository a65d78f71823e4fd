//! Retry observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring executions
//! and a `TracingObserver` implementation that logs using the `tracing` crate.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::error::CancelPoint;
use super::fault::TransportError;

/// Why a failed attempt is being retried
#[derive(Debug, Clone, Copy)]
pub enum RetryCause<'a> {
    /// The server answered with a failed status
    Status(u16),
    /// No answer was obtained
    Transport(&'a TransportError),
}

impl fmt::Display for RetryCause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::Status(status) => write!(f, "status {}", status),
            RetryCause::Transport(error) => write!(f, "{}", error),
        }
    }
}

/// Observer trait for execution events
///
/// Implement this trait to receive callbacks from the retry executor, e.g. for
/// logging or metrics collection. Exactly one of `on_success`, `on_gave_up`,
/// `on_fault` and `on_cancelled` is called per execution.
///
/// # Example
///
/// ```rust
/// use courier_core::retry::{RetryCause, RetryObserver};
/// use std::error::Error;
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, attempt: u32) {}
///     fn on_retry(&self, attempt: u32, cause: RetryCause<'_>, delay: Duration) {}
///     fn on_success(&self, attempts: u32, total_duration: Duration) {}
///     fn on_gave_up(&self, attempts: u32, status: u16) {}
///     fn on_fault(&self, attempts: u32, fault: &dyn Error) {}
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to be sent (1-indexed)
    fn on_attempt_start(&self, attempt: u32);

    /// Called when the policy asked for another attempt
    fn on_retry(&self, attempt: u32, cause: RetryCause<'_>, delay: Duration);

    /// Called when an attempt produced a successful response
    fn on_success(&self, attempts: u32, total_duration: Duration);

    /// Called when the policy accepted a failed response as final
    fn on_gave_up(&self, attempts: u32, status: u16);

    /// Called when a fault is propagated to the caller
    fn on_fault(&self, attempts: u32, fault: &dyn Error);

    /// Called when the execution is cancelled
    fn on_cancelled(&self, attempts: u32, during: CancelPoint) {
        // Default implementation does nothing
        let _ = (attempts, during);
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32) {}

    fn on_retry(&self, _attempt: u32, _cause: RetryCause<'_>, _delay: Duration) {}

    fn on_success(&self, _attempts: u32, _total_duration: Duration) {}

    fn on_gave_up(&self, _attempts: u32, _status: u16) {}

    fn on_fault(&self, _attempts: u32, _fault: &dyn Error) {}
}

/// An observer that logs execution events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_retry`: WARN
/// - `on_success`: INFO (after retries) or DEBUG (first attempt)
/// - `on_gave_up`: WARN
/// - `on_fault`: ERROR
/// - `on_cancelled`: INFO
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being executed (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    ///
    /// # Arguments
    ///
    /// * `operation` - Name of the operation, attached to every event
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Name of the observed operation
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("request")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            "sending attempt"
        );
    }

    fn on_retry(&self, attempt: u32, cause: RetryCause<'_>, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            cause = %cause,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempts: u32, total_duration: Duration) {
        if attempts > 1 {
            tracing::info!(
                operation = %self.operation,
                attempts = attempts,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_gave_up(&self, attempts: u32, status: u16) {
        tracing::warn!(
            operation = %self.operation,
            attempts = attempts,
            status = status,
            "returning failed response, policy declined to retry"
        );
    }

    fn on_fault(&self, attempts: u32, fault: &dyn Error) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            error = %fault,
            "request failed"
        );
    }

    fn on_cancelled(&self, attempts: u32, during: CancelPoint) {
        tracing::info!(
            operation = %self.operation,
            attempts = attempts,
            during = %during,
            "request cancelled"
        );
    }
}

/// An observer that counts execution events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    retries: AtomicU32,
    successes: AtomicU32,
    gave_up: AtomicU32,
    faults: AtomicU32,
    cancellations: AtomicU32,
}

impl StatsObserver {
    /// Create an observer with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attempts started
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Number of retries scheduled
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Number of executions that ended with a successful response
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Number of executions that returned a declined failed response
    pub fn gave_up(&self) -> u32 {
        self.gave_up.load(Ordering::SeqCst)
    }

    /// Number of executions that raised a fault
    pub fn faults(&self) -> u32 {
        self.faults.load(Ordering::SeqCst)
    }

    /// Number of cancelled executions
    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry(&self, _attempt: u32, _cause: RetryCause<'_>, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempts: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_gave_up(&self, _attempts: u32, _status: u16) {
        self.gave_up.fetch_add(1, Ordering::SeqCst);
    }

    fn on_fault(&self, _attempts: u32, _fault: &dyn Error) {
        self.faults.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _attempts: u32, _during: CancelPoint) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32) {
        (**self).on_attempt_start(attempt)
    }

    fn on_retry(&self, attempt: u32, cause: RetryCause<'_>, delay: Duration) {
        (**self).on_retry(attempt, cause, delay)
    }

    fn on_success(&self, attempts: u32, total_duration: Duration) {
        (**self).on_success(attempts, total_duration)
    }

    fn on_gave_up(&self, attempts: u32, status: u16) {
        (**self).on_gave_up(attempts, status)
    }

    fn on_fault(&self, attempts: u32, fault: &dyn Error) {
        (**self).on_fault(attempts, fault)
    }

    fn on_cancelled(&self, attempts: u32, during: CancelPoint) {
        (**self).on_cancelled(attempts, during)
    }
}

/// Implement RetryObserver for Box<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32) {
        (**self).on_attempt_start(attempt)
    }

    fn on_retry(&self, attempt: u32, cause: RetryCause<'_>, delay: Duration) {
        (**self).on_retry(attempt, cause, delay)
    }

    fn on_success(&self, attempts: u32, total_duration: Duration) {
        (**self).on_success(attempts, total_duration)
    }

    fn on_gave_up(&self, attempts: u32, status: u16) {
        (**self).on_gave_up(attempts, status)
    }

    fn on_fault(&self, attempts: u32, fault: &dyn Error) {
        (**self).on_fault(attempts, fault)
    }

    fn on_cancelled(&self, attempts: u32, during: CancelPoint) {
        (**self).on_cancelled(attempts, during)
    }
}
