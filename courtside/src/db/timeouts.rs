//! Time limits on store calls.
//!
//! Single statements are bounded by [`DEFAULT_QUERY_TIMEOUT`]. Transactional
//! units (registration, bracket commit, result write, cancellation) are
//! bounded as a whole by [`DEFAULT_TRANSACTION_TIMEOUT`]; an expired unit is
//! dropped together with its open transaction, which rolls it back and
//! releases any row or advisory locks it held.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Run one statement under [`DEFAULT_QUERY_TIMEOUT`]
pub async fn with_default_timeout<F, T>(statement: F) -> Result<T, TimeoutError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(DEFAULT_QUERY_TIMEOUT, statement).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => Err(TimeoutError::Timeout(DEFAULT_QUERY_TIMEOUT)),
    }
}

/// Bound a unit of work whose error type can absorb a timeout
pub async fn within<F, T, E>(limit: Duration, unit: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match timeout(limit, unit).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError::Timeout(limit).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactions_get_more_time_than_statements() {
        assert!(DEFAULT_TRANSACTION_TIMEOUT > DEFAULT_QUERY_TIMEOUT);
    }

    #[test]
    fn test_timeout_error_display() {
        let err = TimeoutError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }

    #[tokio::test]
    async fn test_within_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, TimeoutError>(())
        };
        let result = within(Duration::from_millis(10), slow).await;
        assert!(matches!(result, Err(TimeoutError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_within_passes_errors_through() {
        let failing = async { Err::<(), _>(TimeoutError::Database(sqlx::Error::RowNotFound)) };
        let result = within(Duration::from_secs(1), failing).await;
        assert!(matches!(result, Err(TimeoutError::Database(_))));
    }

    #[tokio::test]
    async fn test_statement_errors_are_wrapped() {
        let result: Result<(), _> =
            with_default_timeout(async { Err(sqlx::Error::PoolTimedOut) }).await;
        assert!(matches!(result, Err(TimeoutError::Database(sqlx::Error::PoolTimedOut))));
    }
}
