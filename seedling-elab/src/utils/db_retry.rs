//! Database retry logic
//!
//! Exponential backoff for transient SQLite lock contention. The connection
//! busy timeout absorbs most contention; this covers what escapes it.

use std::time::Duration;
use tokio::time::Instant;

use seedling_common::{Error, Result};

/// Default total retry budget
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry a database operation with exponential backoff until `max_wait_ms`
/// elapses
///
/// Only lock contention is retried; every other error returns immediately.
/// Backoff starts at 10ms and doubles up to 1000ms.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_lock_contention() => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Database operation failed: max retry time exceeded"
                    );
                    return Err(Error::Internal(format!(
                        "Database locked after {} attempts ({} ms elapsed, max {} ms): {}",
                        attempt,
                        elapsed.as_millis(),
                        max_wait_ms,
                        err
                    )));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    "Database locked, retrying"
                );

                let remaining = max_duration.saturating_sub(elapsed);
                tokio::time::sleep(Duration::from_millis(backoff_ms).min(remaining)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn locked() -> Error {
        Error::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let result = retry_on_lock("test", 100, || async { Ok::<_, Error>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_retries_lock_errors_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = retry_on_lock("test", 1000, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(locked())
                } else {
                    Ok("saved")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "saved");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_fail_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<()> = retry_on_lock("test", 1000, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::NotFound("row".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_wait() {
        let result: Result<()> = retry_on_lock("test", 50, || async { Err(locked()) }).await;
        assert!(matches!(result, Err(Error::Internal(msg)) if msg.contains("Database locked")));
    }
}
