// ABOUTME: Deadline and retry controllers wrapped around the fetch-and-extract pipeline.
// ABOUTME: Timeouts map to the Timeout error kind; retries back off exponentially in whole seconds.

use std::future::Future;
use std::time::Duration;

use crate::error::{ErrorKind, ScrapeError};

/// Run `fut` under a deadline. On expiry the future is dropped and a
/// Timeout error is returned carrying the configured limit.
pub async fn with_timeout<T, F>(
    fut: F,
    limit: Duration,
    url: &str,
    op: &str,
) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, ScrapeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::timeout(url, op, limit.as_millis())),
    }
}

/// Validation failures and missing pages do not get better on retry.
fn is_transient(err: &ScrapeError) -> bool {
    !matches!(
        err.kind,
        ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::RateLimit
    )
}

/// Run the future produced by `make_fut` up to `1 + max_retries` times,
/// sleeping 2^attempt seconds between attempts, capped at 64 seconds. Only
/// transient failures are retried; the last error wins.
///
/// Retrying takes a factory rather than a future because a future can only
/// be polled to completion once.
pub async fn with_retry<T, F, Fut>(max_retries: u32, mut make_fut: F) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0;
    loop {
        match make_fut().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && is_transient(&err) => {
                let backoff = Duration::from_secs(1 << attempt.min(6));
                tracing::debug!(
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    error = %err,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn timeout_expires_slow_futures() {
        let result: Result<(), _> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
            Duration::from_millis(500),
            "https://example.com",
            "Fetch",
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.to_string().contains("500ms"));
    }

    #[tokio::test]
    async fn timeout_passes_fast_futures_through() {
        let result = with_timeout(
            async { Ok::<_, ScrapeError>(7) },
            Duration::from_secs(1),
            "https://example.com",
            "Fetch",
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_after_failures() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();

        let result = with_retry(3, move || {
            let counter = counter.clone();
            async move {
                counter.set(counter.get() + 1);
                if counter.get() < 3 {
                    Err(ScrapeError::network("https://example.com", "Fetch", None))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_max_and_returns_last_error() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = with_retry(2, move || {
            let counter = counter.clone();
            async move {
                counter.set(counter.get() + 1);
                Err(ScrapeError::network("https://example.com", "Fetch", None))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Network);
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped_for_large_retry_counts() {
        let attempts = Rc::new(Cell::new(0u32));
        let counter = attempts.clone();

        let result: Result<(), _> = with_retry(70, move || {
            let counter = counter.clone();
            async move {
                counter.set(counter.get() + 1);
                Err(ScrapeError::network("https://example.com", "Fetch", None))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Network);
        assert_eq!(attempts.get(), 71);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = with_retry(3, move || {
            let counter = counter.clone();
            async move {
                counter.set(counter.get() + 1);
                Err(ScrapeError::not_found("https://example.com", "Fetch", None))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();

        let _: Result<(), _> = with_retry(0, move || {
            let counter = counter.clone();
            async move {
                counter.set(counter.get() + 1);
                Err(ScrapeError::internal("https://example.com", "Fetch", None))
            }
        })
        .await;

        assert_eq!(attempts.get(), 1);
    }
}
