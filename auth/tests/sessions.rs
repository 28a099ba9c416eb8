//! Integration tests for session lifecycle and CSRF tokens.

mod common;

use belfast_auth::providers::{Clock, SessionStore};
use belfast_auth::{AuthError, SessionManager};
use chrono::Duration;
use common::{CLIENT, Harness, TestEnv};
use std::sync::Arc;

fn manager(h: &Harness) -> SessionManager<TestEnv> {
    SessionManager::new(Arc::clone(&h.env), Arc::clone(&h.config))
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_create_and_load_session() {
    let h = Harness::new();
    let alice = h.create_account("alice", "correct-horse").await;
    let sessions = manager(&h);

    let session = sessions
        .create_session(alice.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();
    assert_eq!(session.id.as_str().len(), 43);
    assert!(session.csrf_token.is_empty());

    let (loaded, account) = sessions.load(&session.id).await.unwrap();
    assert_eq!(loaded, session);
    assert_eq!(account.id, alice.id);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_expired_session_is_deleted_on_load() {
    let h = Harness::new();
    let alice = h.create_account("alice", "correct-horse").await;
    let sessions = manager(&h);
    let session = sessions
        .create_session(alice.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();

    h.clock.advance(Duration::hours(24));
    assert_eq!(sessions.load(&session.id).await, Err(AuthError::SessionNotFound));
    assert!(h.sessions.get(&session.id).await.unwrap().is_none());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_disabled_account_cannot_use_session() {
    let h = Harness::new();
    let alice = h.create_account("alice", "correct-horse").await;
    let sessions = manager(&h);
    let session = sessions
        .create_session(alice.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();

    h.accounts.disable(alice.id, h.clock.now()).unwrap();
    assert_eq!(sessions.load(&session.id).await, Err(AuthError::UserDisabled));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_csrf_is_issued_lazily_and_refreshed_after_expiry() {
    let h = Harness::new();
    let alice = h.create_account("alice", "correct-horse").await;
    let sessions = manager(&h);
    let mut session = sessions
        .create_session(alice.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();
    let expires_at = session.expires_at;

    let first = sessions.ensure_csrf(&mut session).await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(session.csrf_expires_at, h.clock.now() + Duration::hours(2));
    assert!(sessions.verify_csrf(&session, &first));
    assert!(!sessions.verify_csrf(&session, "forged"));

    // Still fresh: same token
    h.clock.advance(Duration::minutes(90));
    assert_eq!(sessions.ensure_csrf(&mut session).await.unwrap(), first);

    // Expired: new token, session expiry untouched
    h.clock.advance(Duration::minutes(31));
    assert!(!sessions.verify_csrf(&session, &first));
    let second = sessions.ensure_csrf(&mut session).await.unwrap();
    assert_ne!(second, first);

    let stored = h.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.csrf_token, second);
    assert_eq!(stored.expires_at, expires_at);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_touch_extends_only_sliding_sessions() {
    let fixed = Harness::new();
    let alice = fixed.create_account("alice", "correct-horse").await;
    let sessions = manager(&fixed);
    let mut session = sessions
        .create_session(alice.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();
    let expires_at = session.expires_at;

    fixed.clock.advance(Duration::hours(1));
    assert!(!sessions.touch(&mut session).await.unwrap());
    assert_eq!(session.expires_at, expires_at);
    assert_eq!(session.last_seen_at, fixed.clock.now());

    let sliding = Harness::with_config(common::config().with_session_sliding(true));
    let bob = sliding.create_account("bob", "correct-horse").await;
    let sessions = manager(&sliding);
    let mut session = sessions
        .create_session(bob.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();

    sliding.clock.advance(Duration::hours(1));
    assert!(sessions.touch(&mut session).await.unwrap());
    assert_eq!(session.expires_at, sliding.clock.now() + Duration::hours(24));
    let stored = sliding.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.expires_at, session.expires_at);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_revoke_sessions_keeps_excepted_one() {
    let h = Harness::new();
    let alice = h.create_account("alice", "correct-horse").await;
    let bob = h.create_account("bob", "correct-horse").await;
    let sessions = manager(&h);

    let keep = sessions.create_session(alice.id, CLIENT.ip, "a").await.unwrap();
    let drop_one = sessions.create_session(alice.id, CLIENT.ip, "b").await.unwrap();
    let drop_two = sessions.create_session(alice.id, CLIENT.ip, "c").await.unwrap();
    let other = sessions.create_session(bob.id, CLIENT.ip, "d").await.unwrap();

    let revoked = sessions.revoke_sessions(alice.id, Some(&keep.id)).await.unwrap();

    assert_eq!(revoked, 2);
    assert!(sessions.load(&keep.id).await.is_ok());
    assert!(sessions.load(&other.id).await.is_ok());
    for gone in [&drop_one.id, &drop_two.id] {
        assert_eq!(sessions.load(gone).await, Err(AuthError::SessionNotFound));
    }

    // Without an exception every session goes
    assert_eq!(sessions.revoke_sessions(alice.id, None).await.unwrap(), 1);
    assert_eq!(sessions.load(&keep.id).await, Err(AuthError::SessionNotFound));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_session_cookie_follows_configuration() {
    let config = common::config().with_cookie(
        "panel_sid",
        true,
        belfast_auth::config::SameSite::Strict,
    );
    let h = Harness::with_config(config);
    let alice = h.create_account("alice", "correct-horse").await;
    let sessions = manager(&h);
    let session = sessions
        .create_session(alice.id, CLIENT.ip, CLIENT.user_agent)
        .await
        .unwrap();

    let header = sessions.cookie(&session).to_header_value();
    assert!(header.starts_with(&format!(
        "panel_sid={}; HttpOnly; SameSite=Strict; Secure; Path=/; Max-Age=86400; Expires=",
        session.id.as_str()
    )));

    // The header parses back into the same cookie
    let parsed = cookie::Cookie::parse(header).unwrap();
    assert_eq!(parsed.value(), session.id.as_str());
    assert_eq!(parsed.same_site(), Some(cookie::SameSite::Strict));
    assert_eq!(parsed.secure(), Some(true));
    assert_eq!(
        parsed.expires_datetime().map(|expires| expires.unix_timestamp()),
        Some(session.expires_at.timestamp())
    );
}
