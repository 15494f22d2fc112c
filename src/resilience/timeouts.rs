//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap dependency calls with a deadline
//! - Keep timeout errors distinct from the wrapped operation's errors

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Either the operation failed or it ran out of time.
#[derive(Debug, Error)]
pub enum TimeoutError<E> {
    #[error("timed out after {0:?}")]
    Elapsed(Duration),

    #[error(transparent)]
    Inner(E),
}

/// Await `fut`, giving up after `limit`.
pub async fn with_timeout<T, E, Fut>(limit: Duration, fut: Fut) -> Result<T, TimeoutError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(TimeoutError::Inner),
        Err(_) => Err(TimeoutError::Elapsed(limit)),
    }
}
