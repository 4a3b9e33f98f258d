//! Wall-clock deadline around a whole request.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{PipelineError, PipelineResult};

/// Race `operation` against a deadline of `timeout_ms`.
///
/// When the deadline fires the operation future is dropped, so no further
/// step is started. An adapter call already running on the blocking pool is
/// left to finish in the background and its result is discarded.
pub async fn run_with_deadline<T, F>(operation: F, timeout_ms: u64) -> PipelineResult<T>
where
    F: Future<Output = PipelineResult<T>>,
{
    match timeout(Duration::from_millis(timeout_ms), operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Operation abandoned after {}ms", timeout_ms);
            Err(PipelineError::Timeout { timeout_ms })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_fast_operation_passes_through() {
        let value = run_with_deadline(async { Ok(7) }, 1_000).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_inner_error_is_not_masked() {
        let err = run_with_deadline::<(), _>(
            async { Err(PipelineError::MissingParameter("x".into())) },
            1_000,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
    }

    #[tokio::test]
    async fn test_slow_operation_times_out() {
        let err = run_with_deadline(
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            20,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.status(), 504);
        assert!(err.to_string().contains("20ms"));
    }
}
