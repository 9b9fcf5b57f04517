//! Optional retry wrapper for adapters, with configurable backoff policies.
//!
//! Only `Transport` failures are retried. Vendor rejections and contract
//! violations are returned on the first attempt.

use std::time::Duration;

use async_trait::async_trait;

use chorus_types::{FailureKind, ProviderFailure};

use crate::{Credential, DynAdapter, PromptRequest, ProviderAdapter, Vendor};

/// Backoff policy controlling the delay between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
    /// No delay between retries.
    None,
}

impl BackoffPolicy {
    /// Compute the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => {
                let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
                let factor = 2u64.saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX));
                Duration::from_millis(base_ms.saturating_mul(factor)).min(*max)
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(8),
        }
    }
}

/// Wraps an adapter and retries transport failures up to `max_retries` times.
pub struct RetryAdapter {
    inner: DynAdapter,
    max_retries: usize,
    policy: BackoffPolicy,
}

impl RetryAdapter {
    pub fn new(inner: DynAdapter, max_retries: usize) -> Self {
        Self {
            inner,
            max_retries,
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl ProviderAdapter for RetryAdapter {
    fn vendor(&self) -> Vendor {
        self.inner.vendor()
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &PromptRequest,
        credential: &Credential,
    ) -> Result<String, ProviderFailure> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(model, prompt, credential).await {
                Err(e) if e.kind == FailureKind::Transport && attempt < self.max_retries => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        vendor = %self.inner.vendor(),
                        model,
                        attempt,
                        delay_ms = %delay.as_millis(),
                        error = %e.message,
                        "Transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
