//! # courier-core
//!
//! Retrying request-execution stage sitting between application requests and
//! the transport that sends them:
//! - Retry loop with pluggable policies, backoff and cooperative cancellation
//! - Translation of transport results into responses, retryable faults and opaque faults
//! - Scoped before-send hooks bound to a request for one execution
//! - Per-attempt diagnostics trees
//! - Retry policy configuration loading (YAML + environment overrides)

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod trace;
pub mod types;

pub use client::{RetryingClient, Transport};
pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use request::{BeforeSendHook, HookScope, Request};
pub use response::Response;
pub use trace::{TraceScope, TraceSummary};
