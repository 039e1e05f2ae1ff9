//! Retry-once-with-jitter around a single `with_deadline` attempt, plus
//! cooperative cancellation. Modeled on the graph crate's retry wrapper:
//! a transient store error (connection reset, pool exhaustion) gets exactly
//! one retry after a small random backoff; a query-shape error or a
//! cancellation never retries.

use crate::errors::{Result, StoreError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const JITTER_MIN_MILLIS: u64 = 20;
const JITTER_MAX_MILLIS: u64 = 80;

fn is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::Kg(_) | StoreError::Rs(_))
}

async fn jitter_backoff() {
    let millis = rand::rng().random_range(JITTER_MIN_MILLIS..=JITTER_MAX_MILLIS);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Runs `op` under `deadline`, racing cooperative cancellation via `cancel`.
/// On a transient error the whole attempt (deadline included) is retried
/// once after a jittered backoff; any other error, or a second failure,
/// is returned as-is.
pub async fn with_deadline_retry<T, F, Fut>(
    deadline: Duration,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match attempt(deadline, cancel, &mut op).await {
        Ok(v) => Ok(v),
        Err(e) if is_transient(&e) && !cancel.is_cancelled() => {
            debug!(error = %e, "transient store error, retrying once after jitter");
            jitter_backoff().await;
            attempt(deadline, cancel, &mut op).await
        }
        Err(e) => Err(e),
    }
}

async fn attempt<T, F, Fut>(deadline: Duration, cancel: &CancellationToken, op: &mut F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let guarded = async {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            res = op() => res,
        }
    };
    tokio::time::timeout(deadline, guarded)
        .await
        .unwrap_or(Err(StoreError::DeadlineExceeded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_is_ok() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let result = with_deadline_retry(Duration::from_secs(1), &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_on_transient_error_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let result = with_deadline_retry(Duration::from_secs(1), &cancel, || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(StoreError::Rs(sqlx::Error::Protocol("connection reset".into())))
                } else {
                    Ok::<_, StoreError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn query_shape_error_is_not_transient_and_never_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let result = with_deadline_retry(Duration::from_secs(1), &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(StoreError::QueryShape {
                    system: "kg",
                    query: "test".into(),
                    detail: "unexpected column count".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_when_already_cancelled() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = with_deadline_retry(Duration::from_secs(1), &cancel, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>(1)
            }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
