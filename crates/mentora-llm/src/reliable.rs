use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use mentora_core::errors::CollaboratorError;
use mentora_core::provider::{ScoreBreakdown, Scorer};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff: `base * 2^attempt`, capped at `max_delay`.
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

/// Retries a [`Scorer`] on retryable errors. Scoring runs once per session
/// after the exam, so a short backoff is cheaper than failing the request.
pub struct ReliableScorer<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: Scorer> ReliableScorer<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, RetryConfig::default())
    }
}

#[async_trait]
impl<S: Scorer> Scorer for ReliableScorer<S> {
    async fn score(&self, transcript: &str) -> Result<ScoreBreakdown, CollaboratorError> {
        let mut attempt = 0;
        loop {
            match self.inner.score(transcript).await {
                Ok(score) => {
                    if attempt > 0 {
                        info!(attempt, "scoring succeeded after retry");
                    }
                    return Ok(score);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.delay(attempt);
                    warn!(
                        attempt,
                        error_kind = e.error_kind(),
                        delay_ms = delay.as_millis() as u64,
                        "scoring failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockScorer;

    fn score() -> ScoreBreakdown {
        ScoreBreakdown {
            relevance: 70,
            clarity: 80,
            mastery: 90,
            feedback: "Baik.".into(),
        }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay(0), Duration::from_secs(1));
        assert_eq!(config.delay(2), Duration::from_secs(4));
        assert_eq!(config.delay(10), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_retryable_errors() {
        let inner = MockScorer::new(vec![
            Err(CollaboratorError::RateLimited),
            Err(CollaboratorError::ServerError {
                status: 503,
                body: String::new(),
            }),
            Ok(score()),
        ]);
        let scorer = ReliableScorer::with_defaults(inner);
        assert_eq!(scorer.score("user: x").await.unwrap(), score());
        assert_eq!(scorer.inner.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let scorer = ReliableScorer::with_defaults(MockScorer::failing(CollaboratorError::RateLimited));
        assert!(scorer.score("user: x").await.is_err());
        assert_eq!(scorer.inner.call_count(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let scorer = ReliableScorer::with_defaults(MockScorer::failing(
            CollaboratorError::AuthenticationFailed("bad key".into()),
        ));
        assert!(scorer.score("user: x").await.is_err());
        assert_eq!(scorer.inner.call_count(), 1);
    }
}
