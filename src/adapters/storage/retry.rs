//! Upload with timeout and exponential backoff
//!
//! Each attempt is bounded by the upload timeout. Transient failures are
//! retried after `initial_delay_ms * multiplier^n` (capped at
//! `max_delay_ms`) plus up to 10% random jitter.

use super::traits::ObjectUploader;
use crate::config::schema::RetryConfig;
use crate::domain::StorageError;
use crate::log_retry_attempt;
use rand::Rng;
use std::path::Path;
use std::time::Duration;

/// Delay before retry number `retry` (0-based), without jitter
pub fn backoff_delay(config: &RetryConfig, retry: usize) -> Duration {
    let exp = config.backoff_multiplier.powi(retry.min(32) as i32);
    let millis = (config.initial_delay_ms as f64 * exp).min(config.max_delay_ms as f64);
    Duration::from_millis(millis as u64)
}

fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_millis() as u64 / 10;
    if max_jitter == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter))
}

/// Upload `local` to `key`, retrying transient failures
///
/// # Errors
///
/// Returns the first non-retryable error as is, or
/// [`StorageError::RetriesExhausted`] once every attempt has failed.
pub async fn upload_with_retry(
    uploader: &dyn ObjectUploader,
    local: &Path,
    key: &str,
    retry: &RetryConfig,
    timeout: Duration,
) -> Result<(), StorageError> {
    let attempts = retry.max_retries + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match tokio::time::timeout(timeout, uploader.upload(local, key)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(_) => StorageError::Timeout {
                key: key.to_string(),
                seconds: timeout.as_secs(),
            },
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if attempt == attempts {
            return Err(StorageError::RetriesExhausted {
                key: key.to_string(),
                attempts,
                last_error: error.to_string(),
            });
        }

        let delay = with_jitter(backoff_delay(retry, attempt - 1));
        log_retry_attempt!(attempt, attempts, error.to_string());
        tracing::debug!(key = %key, delay_ms = delay.as_millis() as u64, "Waiting before next upload attempt");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
        permanent: bool,
    }

    #[async_trait]
    impl ObjectUploader for Flaky {
        async fn upload(&self, _local: &Path, key: &str) -> Result<(), StorageError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.permanent {
                return Err(StorageError::InvalidConfig("no bucket".to_string()));
            }
            if call < self.failures {
                Err(StorageError::PutFailed {
                    key: key.to_string(),
                    message: "503 Slow Down".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    fn fast_retry(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 3.0,
        };
        assert_eq!(backoff_delay(&config, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(300));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(900));
        assert_eq!(backoff_delay(&config, 3), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_bounded() {
        let delay = Duration::from_millis(1000);
        for _ in 0..50 {
            let jittered = with_jitter(delay);
            assert!(jittered >= delay && jittered <= Duration::from_millis(1100));
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let uploader = Flaky {
            failures: 2,
            calls: AtomicUsize::new(0),
            permanent: false,
        };
        upload_with_retry(&uploader, Path::new("x"), "k", &fast_retry(3), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let uploader = Flaky {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
            permanent: false,
        };
        let err =
            upload_with_retry(&uploader, Path::new("x"), "k", &fast_retry(2), Duration::from_secs(1))
                .await
                .unwrap_err();
        assert!(matches!(err, StorageError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let uploader = Flaky {
            failures: 0,
            calls: AtomicUsize::new(0),
            permanent: true,
        };
        let err =
            upload_with_retry(&uploader, Path::new("x"), "k", &fast_retry(5), Duration::from_secs(1))
                .await
                .unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_retryable() {
        struct Hanging;

        #[async_trait]
        impl ObjectUploader for Hanging {
            async fn upload(&self, _local: &Path, _key: &str) -> Result<(), StorageError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }

            fn describe(&self) -> String {
                "hanging".to_string()
            }
        }

        let err = upload_with_retry(
            &Hanging,
            Path::new("x"),
            "k",
            &fast_retry(1),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StorageError::RetriesExhausted { attempts: 2, .. }));
    }
}
