//! Bounded-attempt retry for transiently failing operations.
//!
//! The engine wraps one LLM call *plus* its JSON extraction as a single
//! retryable unit, so a malformed response triggers a fresh generation rather
//! than a re-parse of the same bad text. Intermediate failures are swallowed
//! (logged at debug); only the final failure is surfaced, wrapped in
//! [`RetryError::Exhausted`].

use std::future::Future;

use thiserror::Error;

/// Default number of attempts for retryable operations.
pub const DEFAULT_ATTEMPTS: u32 = 2;

/// Terminal failure after every attempt was used.
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error> {
    /// All attempts failed; `source` is the last error observed.
    #[error("all {attempts} attempts failed: {source}")]
    Exhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The error from the final attempt.
        source: E,
    },
}

impl<E: std::error::Error> RetryError<E> {
    /// Unwrap the final attempt's error.
    #[must_use]
    pub fn into_source(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Run `op` up to `attempts` times, returning the first success.
///
/// `op` receives the 1-based attempt number. `attempts` is clamped to at
/// least one.
pub async fn retry<T, E, F, Fut>(attempts: u32, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error,
{
    let total = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < total => {
                tracing::debug!(attempt, total, %error, "attempt failed, retrying");
                attempt += 1;
            }
            Err(error) => {
                tracing::warn!(attempts = total, %error, "all attempts failed");
                return Err(RetryError::Exhausted {
                    attempts: total,
                    source: error,
                });
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Error)]
    #[error("boom #{0}")]
    struct Boom(u32);

    #[tokio::test]
    async fn first_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError<Boom>> = retry(2, |_| async {
            let _ = calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_attempt_succeeds() {
        let result = retry(2, |attempt| async move {
            if attempt < 2 { Err(Boom(attempt)) } else { Ok("ok") }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn exhaustion_carries_last_error() {
        let result: Result<(), _> = retry(3, |attempt| async move { Err(Boom(attempt)) }).await;
        let err = result.unwrap_err();
        let RetryError::Exhausted { attempts, source } = err;
        assert_eq!(attempts, 3);
        assert_eq!(source.0, 3);
    }

    #[tokio::test]
    async fn zero_attempts_clamps_to_one() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError<Boom>> = retry(0, |attempt| {
            let _ = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(Boom(attempt)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn into_source_unwraps() {
        let result: Result<(), _> = retry(1, |attempt| async move { Err(Boom(attempt)) }).await;
        assert_eq!(result.unwrap_err().into_source().0, 1);
    }
}
