//! Retry execution engine
//!
//! This module provides the retry loop sitting between a request and the
//! transport that sends it.
//!
//! # Features
//!
//! - Pluggable policies deciding on failed responses and transport faults
//! - Translation boundary keeping "server answered with an error" apart from
//!   "request never produced an answer"
//! - Aggregate fault flattening
//! - Cancellable sends and backoff waits via `CancellationToken`
//! - Scoped before-send hooks, detached on every exit path
//! - Observable executions via the `RetryObserver` trait
//! - Configurable standard policy with backoff strategies, retry-after hints
//!   and endpoint failover
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_core::retry::{execute_with_policy, RetryError, StandardRetryPolicy};
//! use courier_core::types::RetryPolicyConfig;
//! use courier_core::{Request, Response};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> Result<Response, RetryError> {
//!     let policy = StandardRetryPolicy::new(RetryPolicyConfig::default());
//!     let mut request = Request::new("read", "GET", "/dbs/app");
//!
//!     execute_with_policy(&mut request, &policy, &CancellationToken::new(), |_request, _scope| async {
//!         // Your transport call here
//!         Ok(Response::new(200, "{}"))
//!     })
//!     .await
//! }
//! ```

mod error;
mod executor;
pub mod fault;
mod observer;
mod policy;
mod provider;
mod standard;
mod strategies;

pub use error::{CancelPoint, RetryError};
pub use executor::{execute_with_policy, RetryExecutor, RetryExecutorBuilder};
pub use fault::{classify, AggregateFault, BoxError, Fault, FaultClass, TransportError};
pub use observer::{NoOpObserver, RetryCause, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{NoRetry, RetryDecision, RetryPolicy};
pub use provider::{ConfiguredPolicyProvider, RetryPolicyProvider};
pub use standard::StandardRetryPolicy;
pub use strategies::{calculate_delay, StatusPredicate};

#[cfg(test)]
mod tests;
