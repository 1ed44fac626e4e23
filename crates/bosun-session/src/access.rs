//! Allow-list enforcement ledger for the first middleware.
//!
//! Tracks failed access attempts per sender and escalates to a one-hour
//! block after three rejections. A background sweeper (driven by the
//! runtime) clears elapsed blocks so the map stays bounded.

use std::collections::HashMap;
use std::sync::Arc;

use bosun_core::UserId;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Rejections tolerated before the block engages.
const MAX_FAILED_ATTEMPTS: u32 = 3;

/// Block duration once attempts are exhausted.
const BLOCK_HOURS: i64 = 1;

#[derive(Debug, Default)]
struct AccessRecord {
    failed_attempts: u32,
    blocked_until: Option<DateTime<Utc>>,
}

/// Outcome of assessing one update against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessVerdict {
    /// The sender is allow-listed; let the update through.
    Allowed,
    /// The sender is under an active block; drop silently.
    Blocked,
    /// The sender is not allow-listed; drop after replying.
    Refused {
        /// How many rejections this sender has accumulated, this one
        /// included. `1` gets the terse refusal, anything later the final
        /// one.
        rejection: u32,
        /// Whether this rejection engaged the block.
        now_blocked: bool,
    },
}

/// Per-process ledger of access failures and blocks.
#[derive(Debug, Clone, Default)]
pub struct AccessLedger {
    inner: Arc<Mutex<HashMap<UserId, AccessRecord>>>,
}

impl AccessLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assess a sender against the allow-list result computed by the caller.
    ///
    /// All counter mutations happen under one lock, so concurrent updates
    /// from the same sender cannot lose increments.
    pub async fn assess(&self, user: UserId, allow_listed: bool) -> AccessVerdict {
        let now = Utc::now();
        let mut guard = self.inner.lock().await;
        let record = guard.entry(user).or_default();

        if let Some(until) = record.blocked_until {
            if now < until {
                warn!(user_id = %user, %until, "update from blocked sender dropped");
                return AccessVerdict::Blocked;
            }
            // Block elapsed: forget it before assessing this update.
            record.blocked_until = None;
            record.failed_attempts = 0;
        }

        if allow_listed {
            debug!(user_id = %user, "sender allow-listed");
            return AccessVerdict::Allowed;
        }

        record.failed_attempts = record.failed_attempts.saturating_add(1);
        let rejection = record.failed_attempts;
        let now_blocked = rejection >= MAX_FAILED_ATTEMPTS;
        if now_blocked {
            let until = now + Duration::hours(BLOCK_HOURS);
            record.blocked_until = Some(until);
            warn!(user_id = %user, %until, "access block engaged");
        } else {
            info!(user_id = %user, rejection, "unauthorised sender refused");
        }

        AccessVerdict::Refused {
            rejection,
            now_blocked,
        }
    }

    /// Drop records whose block has elapsed, resetting their counters.
    ///
    /// Invoked by the hourly sweeper task.
    pub async fn sweep(&self) {
        let now = Utc::now();
        let mut guard = self.inner.lock().await;
        let before = guard.len();
        guard.retain(|_, record| match record.blocked_until {
            Some(until) => now < until,
            // Unblocked records with stale counters are reaped as well.
            None => false,
        });
        let removed = before.saturating_sub(guard.len());
        if removed > 0 {
            debug!(removed, "access ledger swept");
        }
    }

    /// Number of tracked senders. Exposed for the health snapshot.
    pub async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Rewind a sender's block expiry, simulating elapsed time.
    #[cfg(test)]
    async fn rewind_block(&self, user: UserId, hours: i64) {
        let mut guard = self.inner.lock().await;
        if let Some(record) = guard.get_mut(&user) {
            record.blocked_until = record.blocked_until.map(|t| t - Duration::hours(hours));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> UserId {
        UserId(id)
    }

    #[tokio::test]
    async fn allow_listed_sender_passes() {
        let ledger = AccessLedger::new();
        assert_eq!(ledger.assess(user(1), true).await, AccessVerdict::Allowed);
    }

    #[tokio::test]
    async fn third_rejection_engages_block() {
        let ledger = AccessLedger::new();

        assert_eq!(
            ledger.assess(user(1), false).await,
            AccessVerdict::Refused {
                rejection: 1,
                now_blocked: false
            }
        );
        assert_eq!(
            ledger.assess(user(1), false).await,
            AccessVerdict::Refused {
                rejection: 2,
                now_blocked: false
            }
        );
        assert_eq!(
            ledger.assess(user(1), false).await,
            AccessVerdict::Refused {
                rejection: 3,
                now_blocked: true
            }
        );

        // Fourth update within the hour is dropped outright.
        assert_eq!(ledger.assess(user(1), false).await, AccessVerdict::Blocked);
    }

    #[tokio::test]
    async fn block_applies_regardless_of_allow_list() {
        let ledger = AccessLedger::new();
        for _ in 0..3 {
            ledger.assess(user(1), false).await;
        }
        // Even if the sender somehow became allow-listed, the active block
        // still drops the update.
        assert_eq!(ledger.assess(user(1), true).await, AccessVerdict::Blocked);
    }

    #[tokio::test]
    async fn elapsed_block_resets_counter() {
        let ledger = AccessLedger::new();
        for _ in 0..3 {
            ledger.assess(user(1), false).await;
        }
        ledger.rewind_block(user(1), 2).await;

        // Counter restarts from one.
        assert_eq!(
            ledger.assess(user(1), false).await,
            AccessVerdict::Refused {
                rejection: 1,
                now_blocked: false
            }
        );
    }

    #[tokio::test]
    async fn sweep_reaps_elapsed_blocks() {
        let ledger = AccessLedger::new();
        for _ in 0..3 {
            ledger.assess(user(1), false).await;
        }
        ledger.assess(user(2), false).await;
        assert_eq!(ledger.tracked().await, 2);

        ledger.rewind_block(user(1), 2).await;
        ledger.sweep().await;

        // Both the elapsed block and the unblocked stale record are gone.
        assert_eq!(ledger.tracked().await, 0);
    }

    #[tokio::test]
    async fn sweep_keeps_active_blocks() {
        let ledger = AccessLedger::new();
        for _ in 0..3 {
            ledger.assess(user(1), false).await;
        }
        ledger.sweep().await;
        assert_eq!(ledger.tracked().await, 1);
        assert_eq!(ledger.assess(user(1), false).await, AccessVerdict::Blocked);
    }

    #[tokio::test]
    async fn senders_are_counted_independently() {
        let ledger = AccessLedger::new();
        ledger.assess(user(1), false).await;
        assert_eq!(
            ledger.assess(user(2), false).await,
            AccessVerdict::Refused {
                rejection: 1,
                now_blocked: false
            }
        );
    }
}
