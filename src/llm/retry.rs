//! Retrying client — wraps any [`LanguageModelClient`] and re-sends requests
//! that failed with a transient error.
//!
//! Only [`ModelError::Unavailable`] is retried.  Timeouts, rejected prompts
//! and other model errors are returned immediately.  With `max_retries = 0`
//! (the default) the wrapper is a pass-through.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::llm::client::{LanguageModelClient, ModelError};

// ---------------------------------------------------------------------------
// RetryingClient
// ---------------------------------------------------------------------------

/// Bounded retry with exponential backoff around another client.
///
/// # Example
/// ```rust
/// use houdini::config::ModelConfig;
/// use houdini::llm::{GeminiClient, RetryingClient};
///
/// let config = ModelConfig { api_key: Some("key".into()), max_retries: 2, ..ModelConfig::default() };
/// let inner = GeminiClient::from_config(&config).unwrap();
/// let client = RetryingClient::from_config(inner, &config);
/// assert_eq!(client.max_retries(), 2);
/// ```
pub struct RetryingClient<C: LanguageModelClient> {
    inner: C,
    max_retries: u32,
    backoff: Duration,
}

impl<C: LanguageModelClient> RetryingClient<C> {
    pub fn new(inner: C, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }

    /// Take the retry budget and initial backoff from the model settings.
    pub fn from_config(inner: C, config: &ModelConfig) -> Self {
        Self::new(
            inner,
            config.max_retries,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Return a reference to the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: LanguageModelClient> LanguageModelClient for RetryingClient<C> {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let mut attempt = 0;
        let mut delay = self.backoff;

        loop {
            match self.inner.generate(prompt).await {
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "model call failed ({err}); retry {attempt}/{} in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                result => return result,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the given error for the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        error: ModelError,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32, error: ModelError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LanguageModelClient for Flaky {
        async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(format!("echo: {prompt}"))
            }
        }
    }

    fn unavailable() -> ModelError {
        ModelError::Unavailable("503".into())
    }

    #[tokio::test]
    async fn passes_through_success() {
        let client = RetryingClient::new(Flaky::new(0, unavailable()), 3, Duration::ZERO);
        assert_eq!(client.generate("hi").await.unwrap(), "echo: hi");
        assert_eq!(client.inner().calls(), 1);
    }

    #[tokio::test]
    async fn retries_unavailable_until_success() {
        let client = RetryingClient::new(Flaky::new(2, unavailable()), 3, Duration::from_millis(1));
        assert_eq!(client.generate("hi").await.unwrap(), "echo: hi");
        assert_eq!(client.inner().calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let client = RetryingClient::new(Flaky::new(10, unavailable()), 2, Duration::from_millis(1));
        assert_eq!(client.generate("hi").await, Err(unavailable()));
        assert_eq!(client.inner().calls(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_timeouts_or_rejections() {
        let client = RetryingClient::new(Flaky::new(1, ModelError::Timeout), 5, Duration::ZERO);
        assert_eq!(client.generate("hi").await, Err(ModelError::Timeout));
        assert_eq!(client.inner().calls(), 1);

        let rejected = ModelError::InvalidPrompt("bad".into());
        let client = RetryingClient::new(Flaky::new(1, rejected.clone()), 5, Duration::ZERO);
        assert_eq!(client.generate("hi").await, Err(rejected));
        assert_eq!(client.inner().calls(), 1);
    }

    #[tokio::test]
    async fn zero_budget_is_pass_through() {
        let client = RetryingClient::new(Flaky::new(1, unavailable()), 0, Duration::ZERO);
        assert_eq!(client.generate("hi").await, Err(unavailable()));
        assert_eq!(client.inner().calls(), 1);
    }
}
