use std::future::Future;
use std::time::Duration;

use dich_config::retry::RetryConfig;

use crate::client::GenerativeBackend;
use crate::outcome::{RemoteCallOutcome, RemoteError};
use crate::wire::GenerateRequest;

/// Bounded retries for transient failures with linearly growing waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `call` until it succeeds, fails non-transiently, or the budget is spent.
    ///
    /// `call` receives the 1-based attempt number. Attempts never overlap and
    /// nothing waits before the first one.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T, RemoteError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RemoteCallOutcome<T>>,
    {
        let mut attempt = 1;
        loop {
            match call(attempt).await {
                RemoteCallOutcome::Success(value) => return Ok(value),
                RemoteCallOutcome::TransientFailure { status, message } => {
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            "Giving up after {} attempts, last status {}",
                            attempt,
                            status
                        );
                        return Err(RemoteError::Transient {
                            status,
                            message,
                            attempts: attempt,
                        });
                    }

                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed with {}, retrying in {}ms",
                        attempt,
                        self.max_attempts,
                        status,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other.into_result(),
            }
        }
    }

    /// `generate` on `backend` under this policy
    pub async fn generate(
        &self,
        backend: &dyn GenerativeBackend,
        api_key: &str,
        request: &GenerateRequest,
    ) -> Result<String, RemoteError> {
        self.run(|_| backend.generate(api_key, request)).await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
