//! Sliding-window request throttle for the second middleware.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bosun_core::UserId;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Per-user sliding window of recent request instants.
///
/// An update is admitted when fewer than `limit` requests fall inside the
/// trailing `period`; a refused update is **not** recorded, so a flooding
/// sender cannot keep extending their own window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: usize,
    period: Duration,
    windows: Arc<Mutex<HashMap<UserId, VecDeque<Instant>>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` updates per `period` per user.
    #[must_use]
    pub fn new(limit: usize, period: Duration) -> Self {
        Self {
            limit,
            period,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Try to admit one update from `user`.
    ///
    /// Returns `false` when the user is over the limit. A timestamp landing
    /// exactly on the window boundary counts as inside the window.
    pub async fn try_acquire(&self, user: UserId) -> bool {
        let now = Instant::now();
        let mut guard = self.windows.lock().await;
        let window = guard.entry(user).or_default();

        // Keep only instants strictly newer than now - period; an entry at
        // exactly the boundary is inside.
        while let Some(&front) = window.front() {
            if now.saturating_duration_since(front) > self.period {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.limit {
            debug!(user_id = %user, in_window = window.len(), "rate limit exceeded");
            return false;
        }

        window.push_back(now);
        true
    }

    /// Forget users whose window is empty. Called opportunistically by the
    /// access sweeper so idle users do not pin map entries forever.
    pub async fn prune_idle(&self) {
        let now = Instant::now();
        let mut guard = self.windows.lock().await;
        guard.retain(|_, window| {
            window
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) <= self.period)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> UserId {
        UserId(id)
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        for _ in 0..3 {
            assert!(limiter.try_acquire(user(1)).await);
        }
        assert!(!limiter.try_acquire(user(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        assert!(limiter.try_acquire(user(1)).await);
        assert!(limiter.try_acquire(user(1)).await);
        assert!(!limiter.try_acquire(user(1)).await);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(limiter.try_acquire(user(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_timestamp_is_inside() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.try_acquire(user(1)).await);

        // Exactly at the boundary: the old entry still counts.
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!limiter.try_acquire(user(1)).await);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.try_acquire(user(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_updates_do_not_extend_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.try_acquire(user(1)).await);

        // Hammering while limited must not push the window forward.
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(!limiter.try_acquire(user(1)).await);
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.try_acquire(user(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn users_have_independent_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        assert!(limiter.try_acquire(user(1)).await);
        assert!(limiter.try_acquire(user(2)).await);
        assert!(!limiter.try_acquire(user(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn prune_idle_drops_expired_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        limiter.try_acquire(user(1)).await;

        tokio::time::advance(Duration::from_secs(11)).await;
        limiter.prune_idle().await;

        assert!(limiter.windows.lock().await.is_empty());
    }
}
