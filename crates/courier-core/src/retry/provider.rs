//! Per-operation policy providers

use async_trait::async_trait;

use crate::request::Request;
use crate::types::RetryPoliciesConfig;

use super::policy::RetryPolicy;
use super::standard::StandardRetryPolicy;

/// Supplies a fresh policy for each top-level operation
///
/// Obtaining a policy may suspend, e.g. when the provider has to refresh
/// routing information before it can build one.
#[async_trait]
pub trait RetryPolicyProvider: Send + Sync {
    async fn policy_for(&self, request: &Request) -> Box<dyn RetryPolicy>;
}

/// Builds [`StandardRetryPolicy`] instances from configuration
///
/// The request's operation name selects the per-operation policy, falling back
/// to the default one.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPolicyProvider {
    config: RetryPoliciesConfig,
}

impl ConfiguredPolicyProvider {
    /// Create a provider resolving policies from `config`
    pub fn new(config: RetryPoliciesConfig) -> Self {
        Self { config }
    }

    /// The policies this provider resolves from
    pub fn config(&self) -> &RetryPoliciesConfig {
        &self.config
    }

    /// Build the policy for a request synchronously
    pub fn standard_policy_for(&self, request: &Request) -> StandardRetryPolicy {
        StandardRetryPolicy::new(self.config.policy_for(request.operation()).clone())
    }
}

#[async_trait]
impl RetryPolicyProvider for ConfiguredPolicyProvider {
    async fn policy_for(&self, request: &Request) -> Box<dyn RetryPolicy> {
        let policy = self.standard_policy_for(request);
        tracing::trace!(
            operation = %request.operation(),
            max_attempts = policy.config().max_attempts,
            "resolved retry policy"
        );
        Box::new(policy)
    }
}
