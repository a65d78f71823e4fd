//! Retry configuration types
//!
//! These types describe how the standard retry policy behaves for each
//! logical operation. They are deserialized from `courier.yaml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Retry policy configurations
    #[serde(default)]
    pub retry_policies: RetryPoliciesConfig,
}

/// Retry policy configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Default retry policy
    #[serde(default)]
    pub default: RetryPolicyConfig,

    /// Per-operation retry policies, keyed by operation name
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicyConfig>,
}

impl Default for RetryPoliciesConfig {
    fn default() -> Self {
        let mut operations = HashMap::new();

        // Writes are not idempotent on every backend, so only retry when the
        // request provably never left the client.
        operations.insert(
            "write".to_string(),
            RetryPolicyConfig {
                max_attempts: 2,
                strategy: RetryStrategy::FixedDelay,
                retryable_statuses: Vec::new(),
                ..RetryPolicyConfig::default()
            },
        );

        Self {
            default: RetryPolicyConfig::default(),
            operations,
        }
    }
}

impl RetryPoliciesConfig {
    /// Resolve the policy for an operation, falling back to the default
    pub fn policy_for(&self, operation: &str) -> &RetryPolicyConfig {
        self.operations.get(operation).unwrap_or(&self.default)
    }
}

/// Retry policy for an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicyConfig {
    /// Maximum number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Add up to 25% random jitter to computed delays
    #[serde(default = "default_jitter")]
    pub jitter: bool,

    /// Failed response statuses worth retrying
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,

    /// Prefer the server's retry-after hint over the computed delay
    #[serde(default = "default_honor_retry_after")]
    pub honor_retry_after: bool,

    /// Endpoints to fail over across after transport faults
    #[serde(default)]
    pub endpoints: Vec<String>,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            jitter: default_jitter(),
            retryable_statuses: default_retryable_statuses(),
            honor_retry_after: default_honor_retry_after(),
            endpoints: Vec::new(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    100
}
fn default_max_delay() -> u64 {
    30000
}
fn default_jitter() -> bool {
    true
}
fn default_retryable_statuses() -> Vec<u16> {
    vec![408, 425, 429, 500, 502, 503, 504]
}
fn default_honor_retry_after() -> bool {
    true
}

/// Backoff strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Retry immediately
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

impl std::str::FromStr for RetryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "fixed-delay" => Ok(Self::FixedDelay),
            "exponential-backoff" => Ok(Self::ExponentialBackoff),
            "linear-backoff" => Ok(Self::LinearBackoff),
            other => Err(format!("unknown retry strategy: {}", other)),
        }
    }
}
