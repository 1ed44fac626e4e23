//! End-to-end walks of the authentication state machine and the access
//! ledger, mirroring how the bot drives them.

use bosun_core::UserId;
use bosun_session::{
    AccessLedger, AccessVerdict, AttemptOutcome, AuthState, RefererKind, SessionStore,
};

const ADMIN: UserId = UserId(42);

#[tokio::test]
async fn invalid_codes_walk_processing_into_block() {
    let store = SessionStore::new();

    assert_eq!(store.begin_processing(ADMIN).await, AuthState::Processing);

    // Three invalid codes stay in processing with an increasing counter.
    for expected in 1..=3u8 {
        let outcome = store.record_failed_attempt(ADMIN).await;
        assert_eq!(outcome, AttemptOutcome::Retry { attempts: expected });
        assert_eq!(store.state(ADMIN).await, AuthState::Processing);
    }

    // The fourth engages the five-minute block.
    assert!(matches!(
        store.record_failed_attempt(ADMIN).await,
        AttemptOutcome::Blocked { .. }
    ));
    assert_eq!(store.state(ADMIN).await, AuthState::Blocked);

    // While blocked, reopening the prompt is refused.
    assert_eq!(store.begin_processing(ADMIN).await, AuthState::Blocked);
    assert!(!store.is_authenticated(ADMIN).await);
}

#[tokio::test]
async fn reopening_the_prompt_keeps_the_attempt_counter() {
    let store = SessionStore::new();
    store.begin_processing(ADMIN).await;
    store.record_failed_attempt(ADMIN).await;
    store.record_failed_attempt(ADMIN).await;

    // Pressing "Enter 2FA code" again must not grant a fresh budget.
    store.begin_processing(ADMIN).await;
    assert_eq!(store.totp_attempts(ADMIN).await, 2);

    assert_eq!(
        store.record_failed_attempt(ADMIN).await,
        AttemptOutcome::Retry { attempts: 3 }
    );
    assert!(matches!(
        store.record_failed_attempt(ADMIN).await,
        AttemptOutcome::Blocked { .. }
    ));
}

#[tokio::test]
async fn successful_login_authenticates_and_clears_counters() {
    let store = SessionStore::new();
    store.begin_processing(ADMIN).await;
    store.record_failed_attempt(ADMIN).await;

    store.mark_authenticated(ADMIN).await;

    assert_eq!(store.state(ADMIN).await, AuthState::Authenticated);
    assert!(store.is_authenticated(ADMIN).await);
    assert_eq!(store.totp_attempts(ADMIN).await, 0);
    assert!(store.blocked_until(ADMIN).await.is_none());
}

#[tokio::test]
async fn gated_action_resumes_through_the_referer() {
    let store = SessionStore::new();

    // The gate fires on a manage button and stores the exact trigger.
    store
        .set_referer(
            ADMIN,
            RefererKind::CallbackQuery,
            "__manage__:nginx:42",
        )
        .await;

    store.begin_processing(ADMIN).await;
    store.mark_authenticated(ADMIN).await;

    // After login, the stored trigger comes back exactly once.
    let referer = store.take_referer(ADMIN).await.expect("referer stored");
    assert_eq!(referer.kind, RefererKind::CallbackQuery);
    assert_eq!(referer.data, "__manage__:nginx:42");
    assert!(store.take_referer(ADMIN).await.is_none());
}

#[tokio::test]
async fn unknown_sender_is_blocked_after_three_rejections() {
    let ledger = AccessLedger::new();
    let stranger = UserId(999);

    // First rejection: terse text. Second and third: final text, with the
    // third engaging the block.
    assert_eq!(
        ledger.assess(stranger, false).await,
        AccessVerdict::Refused {
            rejection: 1,
            now_blocked: false
        }
    );
    assert_eq!(
        ledger.assess(stranger, false).await,
        AccessVerdict::Refused {
            rejection: 2,
            now_blocked: false
        }
    );
    assert_eq!(
        ledger.assess(stranger, false).await,
        AccessVerdict::Refused {
            rejection: 3,
            now_blocked: true
        }
    );

    // Anything further inside the block window is silently dropped,
    // whatever the content.
    for _ in 0..5 {
        assert_eq!(ledger.assess(stranger, false).await, AccessVerdict::Blocked);
    }
}

#[tokio::test]
async fn allow_listed_users_are_untouched_by_strangers() {
    let ledger = AccessLedger::new();
    let stranger = UserId(999);

    for _ in 0..3 {
        ledger.assess(stranger, false).await;
    }
    assert_eq!(ledger.assess(ADMIN, true).await, AccessVerdict::Allowed);
}
