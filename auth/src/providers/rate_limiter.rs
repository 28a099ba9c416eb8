//! Rate limiter trait for authentication attempts.
//!
//! # Security
//!
//! Rate limiting bounds brute force attempts and, since password hashing is
//! CPU bound, how much hashing work a single client can trigger.

use crate::error::Result;
use std::time::Duration;

/// Rate limiter for authentication attempts.
///
/// Implements sliding window rate limiting keyed by an arbitrary string,
/// usually `"<ip>:<identity>"`.
///
/// # Example
///
/// ```
/// use belfast_auth::providers::RateLimiter;
/// use belfast_auth::stores::InMemoryRateLimiter;
/// use std::time::Duration;
///
/// # async fn example() -> belfast_auth::Result<()> {
/// let limiter = InMemoryRateLimiter::new();
/// limiter.check_and_record("10.0.0.1:alice", 5, Duration::from_secs(60)).await?;
/// # Ok(())
/// # }
/// ```
pub trait RateLimiter: Send + Sync {
    /// Check and record in one atomic operation.
    ///
    /// Records the attempt only if fewer than `max_attempts` are already
    /// recorded for `key` within the trailing `window`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Rate limit exceeded → `AuthError::RateLimited`
    /// - Backing store failure → `AuthError::InternalError`
    fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Reset rate limit for a key.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails.
    fn reset(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Attempts currently recorded for a key.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails.
    fn get_attempts(&self, key: &str) -> impl std::future::Future<Output = Result<u32>> + Send;
}
