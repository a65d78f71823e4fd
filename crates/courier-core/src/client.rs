//! Transport seam and the retrying client
//!
//! [`RetryingClient`] is the pipeline stage itself: it takes a request,
//! obtains the operation's policy from a provider, and drives the transport
//! through the retry executor.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::request::Request;
use crate::response::Response;
use crate::retry::{
    CancelPoint, Fault, RetryError, RetryExecutor, RetryExecutorBuilder, RetryObserver,
    RetryPolicyProvider, TracingObserver,
};
use crate::trace::TraceScope;

/// Performs one send attempt
///
/// Implementations report "the server answered with an error" either as a
/// failed [`Response`] or as [`Fault::Service`]; both are handled the same
/// way. Failures that produced no answer must be reported as
/// [`Fault::Transport`] (or an aggregate containing one) to be retryable.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request, scope: TraceScope) -> Result<Response, Fault>;
}

/// A transport paired with a policy provider and a retry executor
pub struct RetryingClient<T, P, O = TracingObserver> {
    transport: T,
    policies: P,
    executor: RetryExecutor<O>,
}

impl<T, P> RetryingClient<T, P, TracingObserver>
where
    T: Transport,
    P: RetryPolicyProvider,
{
    /// Create a client that logs executions through `tracing`
    pub fn new(transport: T, policies: P) -> Self {
        Self::with_observer(transport, policies, TracingObserver::default())
    }
}

impl<T, P, O> RetryingClient<T, P, O>
where
    T: Transport,
    P: RetryPolicyProvider,
    O: RetryObserver,
{
    /// Create a client reporting executions to `observer`
    ///
    /// # Arguments
    ///
    /// * `transport` - Sends individual attempts
    /// * `policies` - Supplies a fresh retry policy per call
    /// * `observer` - Receives retry loop callbacks
    pub fn with_observer(transport: T, policies: P, observer: O) -> Self {
        Self {
            transport,
            policies,
            executor: RetryExecutorBuilder::new().with_observer(observer).build(),
        }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The observer receiving execution callbacks
    pub fn observer(&self) -> &O {
        self.executor.observer()
    }

    /// Send a request through the retry loop
    ///
    /// A fresh policy is obtained for this call and dropped when it returns.
    /// Diagnostics are recorded under `trace`. Cancelling `cancel` while the
    /// provider is still building the policy ends the call before any attempt.
    pub async fn send(
        &self,
        request: &mut Request,
        trace: &TraceScope,
        cancel: &CancellationToken,
    ) -> Result<Response, RetryError> {
        // Providers may suspend while building a policy
        let policy = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.executor.observer().on_cancelled(0, CancelPoint::BeforeAttempt);
                return Err(RetryError::cancelled(0, CancelPoint::BeforeAttempt));
            }
            policy = self.policies.policy_for(request) => policy,
        };
        let transport = &self.transport;

        self.executor
            .execute(request, &*policy, trace, cancel, |request, scope| {
                transport.send(request, scope)
            })
            .await
    }
}
