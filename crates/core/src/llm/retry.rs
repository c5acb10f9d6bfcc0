use crate::llm::error::is_transient;
use crate::llm::{CompletionRequest, LlmClient, Provider};
use rand::Rng;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Some(n) = std::env::var("LLM_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            out.max_retries = n;
        }
        out
    }

    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// `base * 2^attempt` plus up to `base` of jitter, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let jitter_ms = self.base_delay.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        exp.saturating_add(jitter).min(self.max_delay)
    }
}

/// Retries the wrapped client on transient errors only.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait::async_trait]
impl<C: LlmClient> LlmClient for RetryingClient<C> {
    fn provider(&self) -> Provider {
        self.inner.provider()
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        let mut attempt: u32 = 0;
        loop {
            match self.inner.complete(req.clone()).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.policy.max_retries && is_transient(&err) => {
                    let backoff = self.policy.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        provider = self.inner.provider().as_str(),
                        error = %err,
                        "LLM call failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
