//! Error types for the retry executor
//!
//! Only terminal outcomes show up here. Retryable conditions are absorbed by
//! the loop, and failed responses the policy declined to retry are returned
//! as ordinary `Ok` values.

use std::fmt;

use thiserror::Error;

use super::fault::Fault;

/// Where in the loop a cancellation was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPoint {
    /// At the top of an iteration, before sending
    BeforeAttempt,
    /// While a send was in flight
    Send,
    /// While waiting out a backoff delay
    Backoff,
}

impl fmt::Display for CancelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancelPoint::BeforeAttempt => "before-attempt",
            CancelPoint::Send => "send",
            CancelPoint::Backoff => "backoff",
        };
        f.write_str(s)
    }
}

/// Terminal failure of one execution
#[derive(Debug, Error)]
pub enum RetryError {
    /// A fault the policy declined to retry, or one it never saw
    ///
    /// Carries the fault exactly as the transport produced it (after
    /// aggregate flattening).
    #[error(transparent)]
    Fault(Fault),

    /// The cancellation token fired
    #[error("request cancelled during {during} after {attempts} attempts")]
    Cancelled {
        /// Number of attempts started before cancellation
        attempts: u32,
        /// Where the cancellation was observed
        during: CancelPoint,
    },
}

impl RetryError {
    /// Create a fault error
    pub fn fault(fault: impl Into<Fault>) -> Self {
        RetryError::Fault(fault.into())
    }

    /// Create a cancelled error
    pub fn cancelled(attempts: u32, during: CancelPoint) -> Self {
        RetryError::Cancelled { attempts, during }
    }

    /// Check if this error indicates cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Check if this error carries a fault
    pub fn is_fault(&self) -> bool {
        matches!(self, RetryError::Fault(_))
    }

    /// Get a reference to the fault, if any
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            RetryError::Fault(fault) => Some(fault),
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Get the fault, consuming this error
    pub fn into_fault(self) -> Option<Fault> {
        match self {
            RetryError::Fault(fault) => Some(fault),
            RetryError::Cancelled { .. } => None,
        }
    }
}
