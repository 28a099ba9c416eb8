//! In-process sliding window rate limiter.
//!
//! # Algorithm
//!
//! Each key keeps the timestamps of its recorded attempts. An attempt is
//! allowed when fewer than `max` timestamps fall inside the trailing
//! window; allowed attempts are recorded, denied ones are not.
//!
//! # Concurrency
//!
//! Keys are spread over a fixed number of shards, each behind its own
//! mutex. Two requests for the same key serialize on one shard; unrelated
//! keys rarely contend.
//!
//! # Memory
//!
//! Every shard sweeps windows whose newest event has expired once every
//! few hundred calls, and [`InMemoryRateLimiter::evict_expired`] sweeps all
//! shards on demand. State is lost on restart.

use crate::error::{AuthError, Result};
use crate::providers::{Clock, RateLimiter, SystemClock};
use chrono::{DateTime, Utc};
use std::collections::hash_map::RandomState;
use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const SHARD_COUNT: u64 = 16;
const SWEEP_EVERY: u64 = 256;

#[derive(Debug)]
struct Window {
    events: VecDeque<DateTime<Utc>>,
    span: Duration,
}

impl Window {
    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = window_start(now, self.span);
        while self.events.front().is_some_and(|event| *event <= cutoff) {
            self.events.pop_front();
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.events
            .back()
            .is_none_or(|newest| *newest <= window_start(now, self.span))
    }
}

#[derive(Debug, Default)]
struct Shard {
    windows: Mutex<HashMap<String, Window>>,
    calls: AtomicU64,
}

/// Sharded in-memory rate limiter.
///
/// # Example
///
/// ```
/// use belfast_auth::stores::InMemoryRateLimiter;
/// use std::time::Duration;
///
/// let limiter = InMemoryRateLimiter::new();
/// let window = Duration::from_secs(1);
///
/// assert!(limiter.allow("10.0.0.1:alice", 3, window));
/// assert!(limiter.allow("10.0.0.1:alice", 3, window));
/// assert!(limiter.allow("10.0.0.1:alice", 3, window));
/// assert!(!limiter.allow("10.0.0.1:alice", 3, window));
/// assert!(limiter.allow("10.0.0.2:alice", 3, window));
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryRateLimiter<K = SystemClock> {
    shards: Arc<[Shard]>,
    hasher: RandomState,
    clock: K,
}

impl InMemoryRateLimiter<SystemClock> {
    /// Create a rate limiter on the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryRateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> InMemoryRateLimiter<K> {
    /// Create a rate limiter reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: K) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Shard::default()).collect(),
            hasher: RandomState::new(),
            clock,
        }
    }

    /// Record an attempt if the key has budget left.
    ///
    /// Returns `false` without recording when `max` attempts already fall
    /// inside the trailing `window`.
    #[must_use]
    pub fn allow(&self, key: &str, max: u32, window: Duration) -> bool {
        self.check(key, max, window).is_ok()
    }

    /// Like [`allow`](Self::allow), reporting how long to back off.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Rate limit exceeded → `AuthError::RateLimited`
    /// - Shard lock poisoned → `AuthError::InternalError`
    pub fn check(&self, key: &str, max: u32, window: Duration) -> Result<()> {
        let now = self.clock.now();
        let shard = self.shard(key);
        let mut windows = lock(shard)?;

        if shard.calls.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let before = windows.len();
            windows.retain(|_, entry| !entry.is_expired(now));
            tracing::debug!(evicted = before - windows.len(), "Rate limiter shard swept");
        }

        let entry = windows.entry(key.to_string()).or_insert_with(|| Window {
            events: VecDeque::new(),
            span: window,
        });
        entry.span = window;
        entry.prune(now);

        if entry.events.len() >= max as usize {
            let retry_after = entry
                .events
                .front()
                .and_then(|oldest| (*oldest - window_start(now, window)).to_std().ok())
                .unwrap_or(window);

            tracing::warn!(
                rate_limit_exceeded = true,
                key = %key,
                attempts = entry.events.len(),
                max_attempts = max,
                retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                "Rate limit exceeded"
            );

            return Err(AuthError::RateLimited { retry_after });
        }

        entry.events.push_back(now);

        tracing::debug!(
            key = %key,
            attempts = entry.events.len(),
            max_attempts = max,
            "Rate limit check passed"
        );

        Ok(())
    }

    /// Forget every attempt recorded for `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the shard lock is poisoned.
    pub fn clear(&self, key: &str) -> Result<()> {
        lock(self.shard(key))?.remove(key);
        Ok(())
    }

    /// Attempts inside the key's current window.
    ///
    /// # Errors
    ///
    /// Returns error if the shard lock is poisoned.
    pub fn attempts(&self, key: &str) -> Result<u32> {
        let now = self.clock.now();
        let windows = lock(self.shard(key))?;
        let count = windows.get(key).map_or(0, |entry| {
            let cutoff = window_start(now, entry.span);
            entry.events.iter().filter(|event| **event > cutoff).count()
        });
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Drop every key whose newest event has left its window.
    ///
    /// # Returns
    ///
    /// Number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns error if a shard lock is poisoned.
    pub fn evict_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut evicted = 0;
        for shard in self.shards.iter() {
            let mut windows = lock(shard)?;
            let before = windows.len();
            windows.retain(|_, entry| !entry.is_expired(now));
            evicted += before - windows.len();
        }
        Ok(evicted)
    }

    /// Number of tracked keys.
    ///
    /// # Errors
    ///
    /// Returns error if a shard lock is poisoned.
    pub fn tracked_keys(&self) -> Result<usize> {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += lock(shard)?.len();
        }
        Ok(total)
    }

    fn shard(&self, key: &str) -> &Shard {
        let index = self.hasher.hash_one(key) % SHARD_COUNT;
        let index = usize::try_from(index).unwrap_or_default();
        &self.shards[index]
    }
}

impl<K: Clock> RateLimiter for InMemoryRateLimiter<K> {
    async fn check_and_record(&self, key: &str, max_attempts: u32, window: Duration) -> Result<()> {
        self.check(key, max_attempts, window)
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.clear(key)?;
        tracing::info!(key = %key, "Reset rate limit");
        Ok(())
    }

    async fn get_attempts(&self, key: &str) -> Result<u32> {
        self.attempts(key)
    }
}

fn lock(shard: &Shard) -> Result<MutexGuard<'_, HashMap<String, Window>>> {
    shard
        .windows
        .lock()
        .map_err(|_| AuthError::InternalError("Mutex lock failed".into()))
}

fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;

    const KEY: &str = "203.0.113.7:alice";

    #[test]
    fn test_allows_exactly_max_within_window() {
        let clock = MockClock::new();
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());
        let window = Duration::from_secs(1);

        for i in 1..=3 {
            assert!(limiter.allow(KEY, 3, window), "attempt {i} should be allowed");
            clock.advance(chrono::Duration::milliseconds(100));
        }
        assert!(!limiter.allow(KEY, 3, window), "4th attempt should be denied");
        assert_eq!(limiter.attempts(KEY).unwrap(), 3, "denied attempts are not recorded");
    }

    #[test]
    fn test_allows_again_after_window_elapses() {
        let clock = MockClock::new();
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());
        let window = Duration::from_secs(1);

        for _ in 0..3 {
            assert!(limiter.allow(KEY, 3, window));
        }
        assert!(!limiter.allow(KEY, 3, window));

        clock.advance(chrono::Duration::seconds(1));
        assert!(limiter.allow(KEY, 3, window));
    }

    #[test]
    fn test_window_slides() {
        let clock = MockClock::new();
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());
        let window = Duration::from_secs(1);

        assert!(limiter.allow(KEY, 2, window));
        clock.advance(chrono::Duration::milliseconds(600));
        assert!(limiter.allow(KEY, 2, window));
        assert!(!limiter.allow(KEY, 2, window));

        // First event leaves the window, second is still inside
        clock.advance(chrono::Duration::milliseconds(400));
        assert!(limiter.allow(KEY, 2, window));
        assert!(!limiter.allow(KEY, 2, window));
    }

    #[test]
    fn test_retry_after_tracks_oldest_event() {
        let clock = MockClock::new();
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());
        let window = Duration::from_secs(60);

        limiter.check(KEY, 1, window).unwrap();
        clock.advance(chrono::Duration::seconds(45));

        let err = limiter.check(KEY, 1, window).unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let window = Duration::from_secs(60);

        assert!(limiter.allow("10.0.0.1:alice", 1, window));
        assert!(!limiter.allow("10.0.0.1:alice", 1, window));
        assert!(limiter.allow("10.0.0.1:bob", 1, window));
        assert!(limiter.allow("10.0.0.2:alice", 1, window));
    }

    #[test]
    fn test_evict_expired() {
        let clock = MockClock::new();
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());

        for i in 0..50 {
            assert!(limiter.allow(&format!("key-{i}"), 5, Duration::from_secs(1)));
        }
        assert!(limiter.allow("long", 5, Duration::from_secs(600)));
        assert_eq!(limiter.tracked_keys().unwrap(), 51);

        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(limiter.evict_expired().unwrap(), 50);
        assert_eq!(limiter.tracked_keys().unwrap(), 1);
    }

    #[test]
    fn test_opportunistic_sweep_bounds_growth() {
        let clock = MockClock::new();
        let limiter = InMemoryRateLimiter::with_clock(clock.clone());
        let window = Duration::from_secs(1);

        for i in 0..2_000 {
            assert!(limiter.allow(&format!("burst-{i}"), 1, window));
        }
        clock.advance(chrono::Duration::seconds(5));
        for i in 0..(SHARD_COUNT * SWEEP_EVERY) {
            assert!(limiter.allow(&format!("fresh-{i}"), 1, window));
        }

        // Shards swept after the burst expired dropped its keys
        assert!(limiter.tracked_keys().unwrap() < 4_096 + 500);
    }

    #[tokio::test]
    async fn test_reset_through_trait() {
        let limiter = InMemoryRateLimiter::new();
        let window = Duration::from_secs(60);

        limiter.check_and_record(KEY, 1, window).await.unwrap();
        assert!(matches!(
            limiter.check_and_record(KEY, 1, window).await,
            Err(AuthError::RateLimited { .. })
        ));

        limiter.reset(KEY).await.unwrap();
        assert_eq!(limiter.get_attempts(KEY).await.unwrap(), 0);
        assert!(limiter.check_and_record(KEY, 1, window).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_budget() {
        let limiter = InMemoryRateLimiter::new();
        let mut handles = Vec::new();

        for _ in 0..32 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.allow(KEY, 5, Duration::from_secs(60))
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 5);
    }
}
