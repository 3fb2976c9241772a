//! Retry logic with exponential backoff
//!
//! Transient vault failures are retried with a growing, jittered delay.
//! A `Retry-After` hint from the service replaces the computed delay.

use crate::error::{KeyVaultClientError, Result};
use crate::utils::network::is_retryable_error;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Fraction of the interval added or removed at random
    pub jitter: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(800),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryOptions {
    /// Options that never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn jittered(&self, interval: Duration) -> Duration {
        let jitter = if self.jitter.is_nan() { 0.0 } else { self.jitter.clamp(0.0, 1.0) };
        if jitter == 0.0 {
            return interval.min(self.max_interval);
        }
        let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
        Duration::from_secs_f64(interval.as_secs_f64() * factor).min(self.max_interval)
    }

    /// Delay before the next attempt; a `Retry-After` hint wins over backoff
    fn delay_for(&self, error: &KeyVaultClientError, interval: Duration) -> Duration {
        match error.retry_after() {
            Some(seconds) => Duration::from_secs(seconds).min(self.max_interval),
            None => self.jittered(interval),
        }
    }
}

pub async fn retry_with_backoff<T, F, Fut>(mut operation: F, options: RetryOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut interval = options.initial_interval;
    let mut attempt = 0;

    loop {
        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => error,
        };

        if !is_retryable_error(&error) || attempt >= options.max_retries {
            return Err(error);
        }
        attempt += 1;

        let delay = options.delay_for(&error, interval);
        warn!(
            attempt,
            max_retries = options.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying transient Key Vault failure"
        );

        sleep(delay).await;
        interval = std::cmp::min(
            Duration::from_secs_f64(interval.as_secs_f64() * options.multiplier),
            options.max_interval,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn throttled(retry_after: Option<u64>) -> KeyVaultClientError {
        KeyVaultClientError::Service {
            status: 429,
            code: "Throttled".to_string(),
            message: "slow down".to_string(),
            method: "GET".to_string(),
            url: "https://v.vault.azure.net/secrets/s".to_string(),
            body: String::new(),
            retry_after,
        }
    }

    fn fast() -> RetryOptions {
        RetryOptions {
            max_retries: 2,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = retry_with_backoff(
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(KeyVaultClientError::connection_timeout("v"))
                    } else {
                        Ok(7)
                    }
                }
            },
            fast(),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: Result<()> = retry_with_backoff(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(KeyVaultClientError::connection_timeout("v"))
                }
            },
            fast(),
        )
        .await;

        assert!(matches!(result, Err(KeyVaultClientError::ConnectionTimeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_non_retryable_error_returns_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: Result<()> = tokio_test::block_on(retry_with_backoff(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(KeyVaultClientError::invalid_argument("bad"))
                }
            },
            fast(),
        ));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_after_replaces_backoff_and_is_capped() {
        let options = RetryOptions {
            max_interval: Duration::from_secs(2),
            jitter: 0.0,
            ..RetryOptions::default()
        };
        let interval = Duration::from_millis(10);

        assert_eq!(options.delay_for(&throttled(Some(1)), interval), Duration::from_secs(1));
        assert_eq!(options.delay_for(&throttled(Some(120)), interval), Duration::from_secs(2));
        assert_eq!(options.delay_for(&throttled(None), interval), interval);
    }

    #[test]
    fn test_out_of_range_jitter_is_clamped() {
        for jitter in [5.0, -1.0, f64::NAN, f64::INFINITY] {
            let options = RetryOptions {
                jitter,
                ..RetryOptions::default()
            };
            for _ in 0..50 {
                let delay = options.jittered(Duration::from_millis(100));
                assert!(delay <= Duration::from_millis(201));
            }
        }
    }

    #[tokio::test]
    async fn test_retry_after_hint_drives_the_wait() {
        let options = RetryOptions {
            max_retries: 1,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(300),
            multiplier: 2.0,
            jitter: 0.0,
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let started = Instant::now();
        let result = retry_with_backoff(
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(throttled(Some(1)))
                    } else {
                        Ok("done")
                    }
                }
            },
            options,
        )
        .await;
        let elapsed = started.elapsed();

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // One second asked for, capped at max_interval, far above initial_interval
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(1));
    }
}
