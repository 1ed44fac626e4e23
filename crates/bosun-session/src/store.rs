//! The two-factor authentication session store.
//!
//! One state machine per user:
//!
//! ```text
//! unauthenticated ──(user opens the 2FA prompt)───────► processing
//! processing      ──(valid code, attempts ≤ max)──────► authenticated
//! processing      ──(invalid code, attempts < max)────► processing (+1)
//! processing      ──(invalid code, attempts ≥ max)────► blocked (5 min)
//! blocked         ──(block elapsed)───────────────────► unauthenticated
//! authenticated   ──(login older than 5 min)──────────► unauthenticated
//! ```
//!
//! Expiry transitions are applied lazily on read, under the same write lock
//! as every other mutation, so a user is never observed in two states.

use std::collections::HashMap;
use std::sync::Arc;

use bosun_core::UserId;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Invalid attempts tolerated while staying in `processing`.
const MAX_TOTP_ATTEMPTS: u8 = 3;

/// How long a user stays blocked after exhausting attempts.
const AUTH_BLOCK_MINUTES: i64 = 5;

/// Lifetime of an authenticated session.
const SESSION_TTL_MINUTES: i64 = 5;

/// Authentication state of a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No authentication in progress.
    #[default]
    Unauthenticated,
    /// The user is entering TOTP codes.
    Processing,
    /// A valid code was accepted and the session is live.
    Authenticated,
    /// Too many invalid codes; input is refused until the block elapses.
    Blocked,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Processing => "processing",
            Self::Authenticated => "authenticated",
            Self::Blocked => "blocked",
        };
        f.write_str(label)
    }
}

/// What kind of trigger the referer stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefererKind {
    /// A plain or keyboard message.
    Message,
    /// An inline-keyboard callback.
    CallbackQuery,
}

/// The trigger a user was attempting when they hit the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referer {
    /// Message or callback query.
    pub kind: RefererKind,
    /// The raw trigger text or callback data.
    pub data: String,
}

/// Result of recording an invalid TOTP attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Still in `processing`; the count so far is attached.
    Retry {
        /// Invalid attempts recorded so far.
        attempts: u8,
    },
    /// The attempt budget is exhausted; blocked until the given instant.
    Blocked {
        /// When input is accepted again.
        until: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
struct UserSession {
    auth_state: AuthState,
    totp_attempts: u8,
    blocked_until: Option<DateTime<Utc>>,
    login_time: Option<DateTime<Utc>>,
    referer: Option<Referer>,
}

/// In-memory, process-lifetime session store.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<UserId, UserSession>>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's current state, after applying lazy expiry transitions.
    pub async fn state(&self, user: UserId) -> AuthState {
        let mut guard = self.inner.write().await;
        let session = guard.entry(user).or_default();
        Self::apply_expiry(user, session, Utc::now());
        session.auth_state
    }

    /// Move the user into `processing` (the 2FA prompt was opened).
    ///
    /// A user under an active block stays blocked; the call reports the
    /// resulting state so the handler can phrase its reply.
    pub async fn begin_processing(&self, user: UserId) -> AuthState {
        let mut guard = self.inner.write().await;
        let session = guard.entry(user).or_default();
        Self::apply_expiry(user, session, Utc::now());

        if session.auth_state == AuthState::Blocked {
            return AuthState::Blocked;
        }
        // The attempt counter survives re-opening the prompt; only success
        // or block expiry resets it.
        Self::transition(user, session, AuthState::Processing);
        AuthState::Processing
    }

    /// Record an invalid TOTP code.
    pub async fn record_failed_attempt(&self, user: UserId) -> AttemptOutcome {
        let mut guard = self.inner.write().await;
        let session = guard.entry(user).or_default();
        Self::apply_expiry(user, session, Utc::now());

        if session.totp_attempts >= MAX_TOTP_ATTEMPTS {
            let until = Utc::now() + Duration::minutes(AUTH_BLOCK_MINUTES);
            session.blocked_until = Some(until);
            Self::transition(user, session, AuthState::Blocked);
            warn!(user_id = %user, %until, "TOTP attempt budget exhausted, user blocked");
            return AttemptOutcome::Blocked { until };
        }

        session.totp_attempts = session.totp_attempts.saturating_add(1);
        Self::transition(user, session, AuthState::Processing);
        AttemptOutcome::Retry {
            attempts: session.totp_attempts,
        }
    }

    /// Record a successful TOTP verification.
    ///
    /// Resets the attempt counter, stamps the login time and clears any
    /// stale block.
    pub async fn mark_authenticated(&self, user: UserId) {
        let mut guard = self.inner.write().await;
        let session = guard.entry(user).or_default();
        session.totp_attempts = 0;
        session.blocked_until = None;
        session.login_time = Some(Utc::now());
        Self::transition(user, session, AuthState::Authenticated);
        info!(user_id = %user, "two-factor authentication succeeded");
    }

    /// Whether the user is *effectively* authenticated right now:
    /// authenticated state, login within the TTL, and no active block.
    pub async fn is_authenticated(&self, user: UserId) -> bool {
        let mut guard = self.inner.write().await;
        let Some(session) = guard.get_mut(&user) else {
            return false;
        };
        Self::apply_expiry(user, session, Utc::now());
        session.auth_state == AuthState::Authenticated
    }

    /// Whether the user is under an active TOTP block.
    pub async fn is_blocked(&self, user: UserId) -> bool {
        let mut guard = self.inner.write().await;
        let Some(session) = guard.get_mut(&user) else {
            return false;
        };
        Self::apply_expiry(user, session, Utc::now());
        session.auth_state == AuthState::Blocked
    }

    /// When the active block ends, if there is one.
    pub async fn blocked_until(&self, user: UserId) -> Option<DateTime<Utc>> {
        let guard = self.inner.read().await;
        guard.get(&user).and_then(|s| s.blocked_until)
    }

    /// The attempt counter, as the tests and log lines see it.
    pub async fn totp_attempts(&self, user: UserId) -> u8 {
        let guard = self.inner.read().await;
        guard.get(&user).map_or(0, |s| s.totp_attempts)
    }

    /// Store the trigger a user was attempting when the auth gate fired.
    pub async fn set_referer(&self, user: UserId, kind: RefererKind, data: &str) {
        let mut guard = self.inner.write().await;
        let session = guard.entry(user).or_default();
        session.referer = Some(Referer {
            kind,
            data: data.to_owned(),
        });
        info!(user_id = %user, "referer stored for post-auth resume");
    }

    /// Read and clear the stored referer in one step.
    pub async fn take_referer(&self, user: UserId) -> Option<Referer> {
        let mut guard = self.inner.write().await;
        guard.get_mut(&user).and_then(|s| s.referer.take())
    }

    /// Apply block-expiry and session-TTL transitions in place.
    fn apply_expiry(user: UserId, session: &mut UserSession, now: DateTime<Utc>) {
        if session.auth_state == AuthState::Blocked {
            let elapsed = session.blocked_until.is_none_or(|until| now >= until);
            if elapsed {
                session.blocked_until = None;
                session.totp_attempts = 0;
                Self::transition(user, session, AuthState::Unauthenticated);
            }
        }

        if session.auth_state == AuthState::Authenticated {
            let expired = session
                .login_time
                .is_none_or(|login| now > login + Duration::minutes(SESSION_TTL_MINUTES));
            if expired {
                session.login_time = None;
                session.totp_attempts = 0;
                Self::transition(user, session, AuthState::Unauthenticated);
                info!(user_id = %user, "authenticated session expired");
            }
        }
    }

    fn transition(user: UserId, session: &mut UserSession, next: AuthState) {
        if session.auth_state != next {
            info!(user_id = %user, from = %session.auth_state, to = %next, "auth state transition");
            session.auth_state = next;
        }
    }

    /// Rewind a user's login time, simulating TTL passage.
    #[cfg(test)]
    async fn rewind_login(&self, user: UserId, minutes: i64) {
        let mut guard = self.inner.write().await;
        if let Some(session) = guard.get_mut(&user) {
            session.login_time = session.login_time.map(|t| t - Duration::minutes(minutes));
        }
    }

    /// Rewind a user's block expiry, simulating block passage.
    #[cfg(test)]
    async fn rewind_block(&self, user: UserId, minutes: i64) {
        let mut guard = self.inner.write().await;
        if let Some(session) = guard.get_mut(&user) {
            session.blocked_until = session.blocked_until.map(|t| t - Duration::minutes(minutes));
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
    async fn fresh_user_is_unauthenticated() {
        let store = SessionStore::new();
        assert_eq!(store.state(user(1)).await, AuthState::Unauthenticated);
        assert!(!store.is_authenticated(user(1)).await);
        assert_eq!(store.totp_attempts(user(1)).await, 0);
    }

    #[tokio::test]
    async fn begin_processing_enters_processing() {
        let store = SessionStore::new();
        assert_eq!(store.begin_processing(user(1)).await, AuthState::Processing);
        assert_eq!(store.state(user(1)).await, AuthState::Processing);
    }

    #[tokio::test]
    async fn failed_attempts_count_up_then_block() {
        let store = SessionStore::new();
        store.begin_processing(user(1)).await;

        for expected in 1..=3u8 {
            match store.record_failed_attempt(user(1)).await {
                AttemptOutcome::Retry { attempts } => assert_eq!(attempts, expected),
                AttemptOutcome::Blocked { .. } => panic!("blocked too early"),
            }
        }

        // Fourth invalid attempt exhausts the budget.
        match store.record_failed_attempt(user(1)).await {
            AttemptOutcome::Blocked { until } => assert!(until > Utc::now()),
            AttemptOutcome::Retry { .. } => panic!("expected block"),
        }
        assert_eq!(store.state(user(1)).await, AuthState::Blocked);
        assert!(store.is_blocked(user(1)).await);
    }

    #[tokio::test]
    async fn block_expiry_resets_attempts() {
        let store = SessionStore::new();
        store.begin_processing(user(1)).await;
        for _ in 0..4 {
            store.record_failed_attempt(user(1)).await;
        }
        assert!(store.is_blocked(user(1)).await);

        store.rewind_block(user(1), 10).await;

        assert!(!store.is_blocked(user(1)).await);
        assert_eq!(store.state(user(1)).await, AuthState::Unauthenticated);
        assert_eq!(store.totp_attempts(user(1)).await, 0);
    }

    #[tokio::test]
    async fn successful_auth_resets_and_stamps_login() {
        let store = SessionStore::new();
        store.begin_processing(user(1)).await;
        store.record_failed_attempt(user(1)).await;

        store.mark_authenticated(user(1)).await;

        assert!(store.is_authenticated(user(1)).await);
        assert_eq!(store.totp_attempts(user(1)).await, 0);
    }

    #[tokio::test]
    async fn session_expires_after_ttl() {
        let store = SessionStore::new();
        store.mark_authenticated(user(1)).await;
        assert!(store.is_authenticated(user(1)).await);

        store.rewind_login(user(1), 6).await;

        assert!(!store.is_authenticated(user(1)).await);
        assert_eq!(store.state(user(1)).await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn session_survives_within_ttl() {
        let store = SessionStore::new();
        store.mark_authenticated(user(1)).await;
        store.rewind_login(user(1), 4).await;
        assert!(store.is_authenticated(user(1)).await);
    }

    #[tokio::test]
    async fn begin_processing_refused_while_blocked() {
        let store = SessionStore::new();
        store.begin_processing(user(1)).await;
        for _ in 0..4 {
            store.record_failed_attempt(user(1)).await;
        }
        assert_eq!(store.begin_processing(user(1)).await, AuthState::Blocked);
    }

    #[tokio::test]
    async fn referer_is_taken_once() {
        let store = SessionStore::new();
        store
            .set_referer(user(1), RefererKind::CallbackQuery, "__manage__:nginx:1")
            .await;

        let referer = store.take_referer(user(1)).await.unwrap();
        assert_eq!(referer.kind, RefererKind::CallbackQuery);
        assert_eq!(referer.data, "__manage__:nginx:1");

        assert!(store.take_referer(user(1)).await.is_none());
    }

    #[tokio::test]
    async fn users_are_independent() {
        let store = SessionStore::new();
        store.mark_authenticated(user(1)).await;
        assert!(store.is_authenticated(user(1)).await);
        assert!(!store.is_authenticated(user(2)).await);
    }

    #[tokio::test]
    async fn attempts_zero_after_terminal_states() {
        let store = SessionStore::new();
        store.begin_processing(user(1)).await;
        store.record_failed_attempt(user(1)).await;
        store.mark_authenticated(user(1)).await;
        assert_eq!(store.totp_attempts(user(1)).await, 0);

        store.rewind_login(user(1), 6).await;
        let _ = store.state(user(1)).await;
        assert_eq!(store.totp_attempts(user(1)).await, 0);
    }
}
