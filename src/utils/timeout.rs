//! Timeout utilities
//!
//! A thin wrapper around `tokio::time::timeout` that keeps the inner
//! error type distinguishable from the expiry case.

use std::time::Duration;

/// Apply a timeout to an async operation.
///
/// Returns `TimeoutError::Timeout` if the deadline passes before the
/// operation resolves, otherwise the operation's own result.
pub async fn with_timeout<T, E>(
    timeout: Duration,
    future: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, TimeoutError<E>> {
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Inner(err)),
        Err(_) => Err(TimeoutError::Timeout(timeout)),
    }
}

/// Error type for timed operations.
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Check if this is the expiry case.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutError::Timeout(_))
    }

    /// Get the inner error if the operation failed on its own.
    pub fn into_inner(self) -> Option<E> {
        match self {
            TimeoutError::Inner(e) => Some(e),
            TimeoutError::Timeout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_before_deadline() {
        let result: Result<i32, TimeoutError<String>> =
            with_timeout(Duration::from_secs(1), async { Ok::<_, String>(7) }).await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let result: Result<i32, TimeoutError<String>> = with_timeout(
            Duration::from_secs(1),
            async { Err::<i32, _>("boom".to_string()) },
        )
        .await;

        let err = result.unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(err.into_inner(), Some("boom".to_string()));
    }

    #[tokio::test]
    async fn deadline_expires() {
        let result: Result<i32, TimeoutError<String>> = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, String>(7)
            },
        )
        .await;

        assert!(result.unwrap_err().is_timeout());
    }
}
