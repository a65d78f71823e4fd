//! Configuration types

mod retry_config;

pub use retry_config::{RetryPoliciesConfig, RetryPolicyConfig, RetryStrategy, RuntimeConfig};
