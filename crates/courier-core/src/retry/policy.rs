//! Retry decisions and the policy capability
//!
//! A [`RetryPolicy`] is created for one top-level operation, consulted by the
//! executor after every failed attempt, and dropped when the operation ends.
//! Policies are shared by reference with the executor, so any state they keep
//! across attempts (attempt counters, failover position) uses interior
//! mutability.

use std::time::Duration;

use crate::request::BeforeSendHook;
use crate::response::Response;

use super::fault::TransportError;

/// Whether to try again, and how long to wait first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    retry: bool,
    backoff: Duration,
}

impl RetryDecision {
    /// Retry after waiting `backoff`
    ///
    /// A zero backoff retries immediately. Policies must compute their delay
    /// explicitly: there is no separate "unset" state.
    pub fn retry_after(backoff: Duration) -> Self {
        Self {
            retry: true,
            backoff,
        }
    }

    /// Retry without waiting
    pub fn retry_now() -> Self {
        Self::retry_after(Duration::ZERO)
    }

    /// Stop retrying
    pub fn stop() -> Self {
        Self {
            retry: false,
            backoff: Duration::ZERO,
        }
    }

    /// Whether another attempt should be made
    pub fn should_retry(&self) -> bool {
        self.retry
    }

    /// How long to wait before the next attempt
    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

/// Decides whether and when a failed attempt is retried
///
/// # Example
///
/// ```rust
/// use courier_core::retry::{RetryDecision, RetryPolicy, TransportError};
/// use courier_core::Response;
/// use std::time::Duration;
///
/// struct RetryThrottled;
///
/// impl RetryPolicy for RetryThrottled {
///     fn decide_response(&self, response: &Response) -> RetryDecision {
///         match response.status() {
///             429 => RetryDecision::retry_after(Duration::from_millis(100)),
///             _ => RetryDecision::stop(),
///         }
///     }
///
///     fn decide_fault(&self, _fault: &TransportError) -> RetryDecision {
///         RetryDecision::stop()
///     }
/// }
/// ```
pub trait RetryPolicy: Send + Sync {
    /// Decide on a failed (non-2xx) response
    fn decide_response(&self, response: &Response) -> RetryDecision;

    /// Decide on a transport fault
    fn decide_fault(&self, fault: &TransportError) -> RetryDecision;

    /// Hook run against the request before each attempt, if any
    fn before_send_hook(&self) -> Option<&dyn BeforeSendHook> {
        None
    }
}

impl<T: RetryPolicy + ?Sized> RetryPolicy for Box<T> {
    fn decide_response(&self, response: &Response) -> RetryDecision {
        (**self).decide_response(response)
    }

    fn decide_fault(&self, fault: &TransportError) -> RetryDecision {
        (**self).decide_fault(fault)
    }

    fn before_send_hook(&self) -> Option<&dyn BeforeSendHook> {
        (**self).before_send_hook()
    }
}

impl<T: RetryPolicy + ?Sized> RetryPolicy for std::sync::Arc<T> {
    fn decide_response(&self, response: &Response) -> RetryDecision {
        (**self).decide_response(response)
    }

    fn decide_fault(&self, fault: &TransportError) -> RetryDecision {
        (**self).decide_fault(fault)
    }

    fn before_send_hook(&self) -> Option<&dyn BeforeSendHook> {
        (**self).before_send_hook()
    }
}

/// A policy that never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn decide_response(&self, _response: &Response) -> RetryDecision {
        RetryDecision::stop()
    }

    fn decide_fault(&self, _fault: &TransportError) -> RetryDecision {
        RetryDecision::stop()
    }
}
