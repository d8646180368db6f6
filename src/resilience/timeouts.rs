//! Deadline enforcement.
//!
//! # Responsibilities
//! - Wrap the whole exchange (send, body read, decoding) in one deadline
//! - Cancel the in-flight future when the deadline fires
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future aborts the request
//! - Timeout errors are distinct from other errors; callers record them
//! - A timed-out request never yields partial data
//! - A future that finishes only after its deadline (blocking work inside a
//!   single poll) is still reported as a timeout

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{SecurityError, SecurityResult};

/// Run `fut` under a deadline of `timeout_ms` milliseconds.
pub async fn with_deadline<F, T>(timeout_ms: u64, fut: F) -> SecurityResult<T>
where
    F: Future<Output = SecurityResult<T>>,
{
    let deadline = Duration::from_millis(timeout_ms);
    let started = Instant::now();
    match tokio::time::timeout(deadline, fut).await {
        Ok(_) if started.elapsed() > deadline => Err(SecurityError::Timeout(timeout_ms)),
        Ok(result) => result,
        Err(_) => Err(SecurityError::Timeout(timeout_ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let result: SecurityResult<u32> = with_deadline(50, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;
        assert_eq!(result, Err(SecurityError::Timeout(50)));
    }

    #[tokio::test]
    async fn test_fast_future_passes_through() {
        let result = with_deadline(1_000, async { Ok::<_, SecurityError>("done") }).await;
        assert_eq!(result, Ok("done"));
    }

    #[tokio::test]
    async fn test_late_completion_counts_as_timeout() {
        let result = with_deadline(20, async {
            std::thread::sleep(Duration::from_millis(80));
            Ok::<_, SecurityError>("too late")
        })
        .await;
        assert_eq!(result, Err(SecurityError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        let result: SecurityResult<()> =
            with_deadline(1_000, async { Err(SecurityError::AuthenticationRequired) }).await;
        assert_eq!(result, Err(SecurityError::AuthenticationRequired));
    }
}
