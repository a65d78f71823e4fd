//! Configurable standard retry policy
//!
//! Retries retryable statuses and transport faults until the configured number
//! of attempts has been made. When a list of endpoints is configured the
//! policy also acts as a before-send hook, moving to the next endpoint after
//! every transport fault.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::request::{BeforeSendHook, Request};
use crate::response::Response;
use crate::types::RetryPolicyConfig;

use super::fault::TransportError;
use super::policy::{RetryDecision, RetryPolicy};
use super::strategies::{calculate_delay, StatusPredicate};

/// The policy built from a [`RetryPolicyConfig`]
///
/// One instance serves exactly one execution: its attempt counter and
/// failover position are never reset.
#[derive(Debug)]
pub struct StandardRetryPolicy {
    config: RetryPolicyConfig,
    statuses: StatusPredicate,
    /// Failed attempts decided on so far
    failures: AtomicU32,
    /// Transport faults seen so far; selects the endpoint
    failovers: AtomicU32,
}

impl StandardRetryPolicy {
    /// Create a policy for one execution
    ///
    /// # Arguments
    ///
    /// * `config` - Attempt budget, backoff curve, retryable statuses and
    ///   failover endpoints
    pub fn new(config: RetryPolicyConfig) -> Self {
        let statuses = StatusPredicate::with_codes(config.retryable_statuses.clone());
        Self {
            config,
            statuses,
            failures: AtomicU32::new(0),
            failovers: AtomicU32::new(0),
        }
    }

    /// The configuration this policy was built from
    pub fn config(&self) -> &RetryPolicyConfig {
        &self.config
    }

    /// Number of failed attempts seen so far
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// The endpoint the next attempt will be routed to, if endpoints are configured
    pub fn current_endpoint(&self) -> Option<&str> {
        let endpoints = &self.config.endpoints;
        if endpoints.is_empty() {
            return None;
        }
        let index = self.failovers.load(Ordering::SeqCst) as usize % endpoints.len();
        Some(endpoints[index].as_str())
    }

    /// Record a failure and report whether another attempt is allowed
    fn record_failure(&self) -> Option<u32> {
        let failed_attempt = self.failures.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        (failed_attempt < self.config.max_attempts).then_some(failed_attempt)
    }

    fn backoff_for(&self, failed_attempt: u32) -> Duration {
        calculate_delay(&self.config, failed_attempt, self.config.jitter)
    }
}

impl RetryPolicy for StandardRetryPolicy {
    fn decide_response(&self, response: &Response) -> RetryDecision {
        if !self.statuses.is_retryable_code(response.status()) {
            return RetryDecision::stop();
        }

        let Some(failed_attempt) = self.record_failure() else {
            tracing::debug!(
                status = response.status(),
                max_attempts = self.config.max_attempts,
                "retry budget exhausted"
            );
            return RetryDecision::stop();
        };

        let backoff = match response.retry_after() {
            Some(hint) if self.config.honor_retry_after => {
                hint.min(Duration::from_millis(self.config.max_delay_ms))
            }
            _ => self.backoff_for(failed_attempt),
        };

        RetryDecision::retry_after(backoff)
    }

    fn decide_fault(&self, fault: &TransportError) -> RetryDecision {
        let Some(failed_attempt) = self.record_failure() else {
            tracing::debug!(
                error = %fault,
                max_attempts = self.config.max_attempts,
                "retry budget exhausted"
            );
            return RetryDecision::stop();
        };

        if !self.config.endpoints.is_empty() {
            let failovers = self.failovers.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(failovers, error = %fault, "failing over to next endpoint");
        }

        RetryDecision::retry_after(self.backoff_for(failed_attempt))
    }

    fn before_send_hook(&self) -> Option<&dyn BeforeSendHook> {
        if self.config.endpoints.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl BeforeSendHook for StandardRetryPolicy {
    fn before_send(&self, request: &mut Request) {
        if let Some(endpoint) = self.current_endpoint() {
            request.set_endpoint(endpoint);
        }
    }
}
