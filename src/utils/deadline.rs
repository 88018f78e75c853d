// Request deadlines shared by every agent stage

use crate::types::{AppError, AppResult};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::warn;

/// Longest deadline a request may ask for
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Absolute deadline `seconds` from now, at most [`MAX_TIMEOUT_SECS`]
pub fn deadline_after(seconds: u64) -> AppResult<Instant> {
    if seconds > MAX_TIMEOUT_SECS {
        return Err(AppError::InvalidRequest(format!(
            "timeout of {} seconds exceeds the maximum of {}",
            seconds, MAX_TIMEOUT_SECS
        )));
    }
    Instant::now()
        .checked_add(Duration::from_secs(seconds))
        .ok_or_else(|| AppError::InvalidRequest(format!("timeout of {} seconds is out of range", seconds)))
}

/// Run `fut`, cancelling it when `deadline` passes.
///
/// Expiry is reported as [`AppError::Timeout`] so callers can tell it apart
/// from an upstream failure.
pub async fn with_deadline<F, T>(deadline: Instant, stage: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(stage, "Deadline exceeded");
            Err(AppError::Timeout(format!("{} did not finish before the deadline", stage)))
        }
    }
}

/// Forward `stream` until it ends, failing with [`AppError::Timeout`] if the
/// next item has not arrived by `deadline`.
pub fn stream_with_deadline<S, T>(deadline: Instant, stage: &'static str, stream: S) -> impl Stream<Item = AppResult<T>>
where
    S: Stream<Item = AppResult<T>>,
{
    try_stream! {
        futures::pin_mut!(stream);
        loop {
            match timeout_at(deadline, stream.next()).await {
                Ok(Some(item)) => yield item?,
                Ok(None) => break,
                Err(_) => {
                    warn!(stage, "Deadline exceeded while streaming");
                    Err::<(), _>(AppError::Timeout(format!("{} did not finish before the deadline", stage)))?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_before_deadline() {
        let value = with_deadline(deadline_after(5).unwrap(), "quick", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_expiry_is_timeout_not_upstream_error() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let err = with_deadline(deadline, "web surfer run", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.to_string().contains("web surfer run"));
    }

    #[test]
    fn test_oversized_timeout_is_rejected() {
        assert!(deadline_after(MAX_TIMEOUT_SECS).is_ok());
        assert!(matches!(deadline_after(MAX_TIMEOUT_SECS + 1), Err(AppError::InvalidRequest(_))));
        assert!(matches!(deadline_after(u64::MAX), Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_stalled_stream_ends_with_timeout() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let source = futures::stream::iter(vec![Ok("first".to_string())]).chain(futures::stream::pending());
        let items: Vec<AppResult<String>> = stream_with_deadline(deadline, "chat stream", source).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "first");
        assert!(matches!(items[1], Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = with_deadline(deadline_after(5).unwrap(), "selector", async {
            Err::<(), _>(AppError::LLMApi("boom".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }
}
