//! Retry execution engine
//!
//! The executor owns the retry loop for one logical request:
//! send, translate the result, consult the policy, wait out the backoff, and
//! repeat until a terminal outcome. Cancellation is checked at the top of
//! every iteration and raced against both the send and the backoff wait.

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::request::{HookScope, Request};
use crate::response::Response;
use crate::trace::TraceScope;

use super::error::{CancelPoint, RetryError};
use super::fault::{self, Fault, Outcome};
use super::observer::{NoOpObserver, RetryCause, RetryObserver};
use super::policy::{RetryDecision, RetryPolicy};

/// Execute one request with a policy and no observer
///
/// This is a convenience function for simple cases. It records diagnostics
/// under a fresh root scope named after the request's operation. For more
/// control, use `RetryExecutorBuilder`.
///
/// # Example
///
/// ```rust,no_run
/// use courier_core::retry::{execute_with_policy, NoRetry};
/// use courier_core::{Request, Response};
/// use tokio_util::sync::CancellationToken;
///
/// async fn example() {
///     let mut request = Request::new("read", "GET", "/dbs/app");
///     let cancel = CancellationToken::new();
///
///     let result = execute_with_policy(&mut request, &NoRetry, &cancel, |_request, _scope| async {
///         Ok(Response::new(200, "{}"))
///     })
///     .await;
/// }
/// ```
pub async fn execute_with_policy<P, F, Fut>(
    request: &mut Request,
    policy: &P,
    cancel: &CancellationToken,
    send: F,
) -> Result<Response, RetryError>
where
    P: RetryPolicy + ?Sized,
    F: FnMut(Request, TraceScope) -> Fut,
    Fut: Future<Output = Result<Response, Fault>>,
{
    let trace = TraceScope::root(request.operation().to_string());
    RetryExecutor::new()
        .execute(request, policy, &trace, cancel, send)
        .await
}

/// Builder for configuring a `RetryExecutor`
///
/// # Example
///
/// ```rust
/// use courier_core::retry::{RetryExecutorBuilder, TracingObserver};
///
/// let executor = RetryExecutorBuilder::new()
///     .with_observer(TracingObserver::new("read-document"))
///     .build();
/// ```
pub struct RetryExecutorBuilder<O = NoOpObserver> {
    observer: O,
}

impl Default for RetryExecutorBuilder<NoOpObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder<NoOpObserver> {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            observer: NoOpObserver,
        }
    }
}

impl<O> RetryExecutorBuilder<O> {
    /// Set the observer
    ///
    /// The observer receives callbacks during execution.
    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<O2> {
        RetryExecutorBuilder { observer }
    }

    /// Build the executor
    pub fn build(self) -> RetryExecutor<O> {
        RetryExecutor {
            observer: self.observer,
        }
    }
}

/// The retry loop
///
/// Holds no per-request state, so one executor can serve any number of
/// concurrent executions; each brings its own request, policy and token.
pub struct RetryExecutor<O = NoOpObserver> {
    observer: O,
}

impl RetryExecutor<NoOpObserver> {
    /// Create an executor without an observer
    pub fn new() -> Self {
        RetryExecutorBuilder::new().build()
    }
}

impl Default for RetryExecutor<NoOpObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> RetryExecutor<O>
where
    O: RetryObserver,
{
    /// The observer receiving execution callbacks
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Execute a request until a terminal outcome
    ///
    /// # Arguments
    ///
    /// * `request` - The request; the policy's before-send hook is bound to it
    ///   for the duration of this call
    /// * `policy` - Decides on failed responses and transport faults
    /// * `trace` - Parent scope for per-attempt and per-decision diagnostics
    /// * `cancel` - Cooperative cancellation token
    /// * `send` - Performs one attempt given a request snapshot and the
    ///   attempt's trace scope
    ///
    /// # Returns
    ///
    /// - `Ok(response)` for a successful response, or for a failed response
    ///   the policy declined to retry
    /// - `Err(RetryError::Fault)` for a transport fault the policy declined to
    ///   retry, or an unrecognized fault
    /// - `Err(RetryError::Cancelled)` when `cancel` fires
    pub async fn execute<P, F, Fut>(
        &self,
        request: &mut Request,
        policy: &P,
        trace: &TraceScope,
        cancel: &CancellationToken,
        mut send: F,
    ) -> Result<Response, RetryError>
    where
        P: RetryPolicy + ?Sized,
        F: FnMut(Request, TraceScope) -> Fut,
        Fut: Future<Output = Result<Response, Fault>>,
    {
        let start = Instant::now();
        // Detaches on every exit path, including the caller dropping this future
        let mut hook = HookScope::attach(request, policy.before_send_hook());
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempt, CancelPoint::BeforeAttempt));
            }

            attempt = attempt.saturating_add(1);
            self.observer.on_attempt_start(attempt);

            let snapshot = hook.prepare();
            // Moved into the send; closed when that attempt's future is done
            let scope = trace.start_child(format!("attempt {}", attempt));
            let span = scope.span().clone();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = send(snapshot, scope).instrument(span) => Some(result),
            };
            let Some(result) = result else {
                return Err(self.cancelled(attempt, CancelPoint::Send));
            };

            let decision = match fault::translate(result) {
                Outcome::Response(response) if response.is_success() => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(response);
                }
                Outcome::Response(response) => {
                    let decision = Self::decide(trace, || policy.decide_response(&response));
                    if !decision.should_retry() {
                        self.observer.on_gave_up(attempt, response.status());
                        return Ok(response);
                    }
                    self.observer
                        .on_retry(attempt, RetryCause::Status(response.status()), decision.backoff());
                    decision
                }
                Outcome::Retryable(error) => {
                    let decision = Self::decide(trace, || policy.decide_fault(&error));
                    if !decision.should_retry() {
                        let fault = Fault::Transport(error);
                        self.observer.on_fault(attempt, &fault);
                        return Err(RetryError::Fault(fault));
                    }
                    self.observer
                        .on_retry(attempt, RetryCause::Transport(&error), decision.backoff());
                    decision
                }
                Outcome::Terminal(fault) => {
                    self.observer.on_fault(attempt, &fault);
                    return Err(RetryError::Fault(fault));
                }
            };

            // Zero backoff means retry immediately
            let backoff = decision.backoff();
            if !backoff.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(self.cancelled(attempt, CancelPoint::Backoff));
                    }
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    fn decide(trace: &TraceScope, decide: impl FnOnce() -> RetryDecision) -> RetryDecision {
        let scope = trace.start_child("retry-decision");
        let decision = scope.span().in_scope(decide);
        scope.close();
        decision
    }

    fn cancelled(&self, attempts: u32, during: CancelPoint) -> RetryError {
        self.observer.on_cancelled(attempts, during);
        RetryError::cancelled(attempts, during)
    }
}
