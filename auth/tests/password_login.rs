//! Integration tests for password login, logout and password change.

mod common;

use belfast_auth::providers::{AccountRepository, Clock, SessionStore};
use belfast_auth::{AuthError, ClientInfo, SessionId};
use chrono::Duration;
use common::{CLIENT, Harness};

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_login_success_issues_session_and_cookie() {
    let h = Harness::new();
    let account = h.create_account("Alice", "correct-horse").await;

    let outcome = h.login.login("  alice ", "correct-horse", CLIENT).await.unwrap();

    assert_eq!(outcome.account.id, account.id);
    assert_eq!(outcome.session.account_id, account.id);
    assert_eq!(outcome.session.ip_address, CLIENT.ip);
    assert_eq!(outcome.session.expires_at, h.clock.now() + Duration::hours(24));
    assert_eq!(outcome.cookie.name, "belfast_session");
    assert_eq!(outcome.cookie.value, outcome.session.id.as_str());
    assert!(outcome.cookie.http_only);

    assert!(h.sessions.get(&outcome.session.id).await.unwrap().is_some());
    assert_eq!(h.audit.actions(), vec!["login.success"]);

    let stored = h.accounts.snapshot(account.id).unwrap().unwrap();
    assert_eq!(stored.last_login_at, Some(h.clock.now()));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_wrong_password_is_generic_and_creates_no_session() {
    let h = Harness::new();
    let account = h.create_account("alice", "correct-horse").await;

    let result = h.login.login("alice", "wrong", CLIENT).await;

    assert_eq!(result.unwrap_err().code(), "auth.invalid_credentials");
    assert_eq!(h.sessions.session_count().unwrap(), 0);
    let events = h.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "login.fail");
    assert_eq!(events[0].target, Some(account.id));
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_unknown_user_fails_like_wrong_password() {
    let h = Harness::new();
    h.create_account("alice", "correct-horse").await;

    let unknown = h.login.login("mallory", "correct-horse", CLIENT).await;
    let wrong = h.login.login("alice", "incorrect-horse", CLIENT).await;

    assert_eq!(unknown, Err(AuthError::InvalidCredentials));
    assert_eq!(wrong, Err(AuthError::InvalidCredentials));
    assert_eq!(h.audit.actions(), vec!["login.fail", "login.fail"]);
}

#[tokio::test]
async fn test_blank_username_is_rejected_before_rate_limiting() {
    let h = Harness::new();

    for _ in 0..10 {
        let result = h.login.login("   ", "whatever", CLIENT).await;
        assert_eq!(result, Err(AuthError::UsernameRequired));
    }
    assert!(h.audit.events().is_empty());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_disabled_account_is_checked_after_password() {
    let h = Harness::new();
    let account = h.create_account("alice", "correct-horse").await;
    h.accounts.disable(account.id, h.clock.now()).unwrap();

    let wrong = h.login.login("alice", "not-the-password", CLIENT).await;
    assert_eq!(wrong, Err(AuthError::InvalidCredentials));

    let right = h.login.login("alice", "correct-horse", CLIENT).await;
    assert_eq!(right, Err(AuthError::UserDisabled));
    assert_eq!(h.sessions.session_count().unwrap(), 0);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_login_is_rate_limited_per_ip_and_username() {
    let h = Harness::new();
    h.create_account("alice", "correct-horse").await;

    for _ in 0..5 {
        let result = h.login.login("alice", "wrong", CLIENT).await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    // Even the right password is refused while limited
    let limited = h.login.login("ALICE", "correct-horse", CLIENT).await.unwrap_err();
    assert_eq!(limited.code(), "auth.rate_limited");
    assert_eq!(limited.retry_after(), Some(std::time::Duration::from_secs(60)));

    // Another address is unaffected
    let other = ClientInfo {
        ip: "198.51.100.1",
        user_agent: "other",
    };
    assert!(h.login.login("alice", "correct-horse", other).await.is_ok());

    // And the window slides
    h.clock.advance(Duration::seconds(61));
    assert!(h.login.login("alice", "correct-horse", CLIENT).await.is_ok());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_logout_revokes_session_and_clears_cookie() {
    let h = Harness::new();
    let account = h.create_account("alice", "correct-horse").await;
    let outcome = h.login.login("alice", "correct-horse", CLIENT).await.unwrap();

    let cookie = h.login.logout(&outcome.session.id).await.unwrap();

    assert_eq!(cookie.value, "");
    assert_eq!(cookie.max_age, 0);
    assert_eq!(
        h.login.sessions().load(&outcome.session.id).await,
        Err(AuthError::SessionNotFound)
    );
    let last = h.audit.events().pop().unwrap();
    assert_eq!(last.action, "logout");
    assert_eq!(last.actor, Some(account.id));

    // Logging out twice still clears the cookie
    assert!(h.login.logout(&outcome.session.id).await.is_ok());
    assert_eq!(h.audit.actions().iter().filter(|a| *a == "logout").count(), 1);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_change_password_revokes_other_sessions() {
    let h = Harness::new();
    let account = h.create_account("alice", "correct-horse").await;
    let current = h.login.login("alice", "correct-horse", CLIENT).await.unwrap();
    let laptop = h.login.login("alice", "correct-horse", CLIENT).await.unwrap();
    let phone = h.login.login("alice", "correct-horse", CLIENT).await.unwrap();

    let revoked = h
        .login
        .change_password(account.id, &current.session.id, "correct-horse", "battery-staple-42")
        .await
        .unwrap();

    assert_eq!(revoked, 2);
    assert!(h.login.sessions().load(&current.session.id).await.is_ok());
    for gone in [&laptop.session.id, &phone.session.id] {
        assert_eq!(h.login.sessions().load(gone).await, Err(AuthError::SessionNotFound));
    }
    assert_eq!(h.audit.actions().last().unwrap(), "password.change");

    assert_eq!(
        h.login.login("alice", "correct-horse", CLIENT).await,
        Err(AuthError::InvalidCredentials)
    );
    assert!(h.login.login("alice", "battery-staple-42", CLIENT).await.is_ok());
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_change_password_checks_current_and_bounds() {
    let h = Harness::new();
    let account = h.create_account("alice", "correct-horse").await;
    let session = SessionId::new();

    assert_eq!(
        h.login
            .change_password(account.id, &session, "not-current", "battery-staple-42")
            .await,
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(
        h.login
            .change_password(account.id, &session, "correct-horse", "short")
            .await,
        Err(AuthError::PasswordTooShort)
    );

    let stored = h.accounts.get_by_id(account.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, account.password_hash);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_login_upgrades_outdated_hash() {
    let h = Harness::new();
    let account = h.create_account("alice", "correct-horse").await;

    // Same stores, stronger parameters
    let mut stronger = common::config();
    stronger.password_hash_params.iterations = 2;
    let upgraded = belfast_auth::LoginService::new(h.env.clone(), std::sync::Arc::new(stronger)).unwrap();

    upgraded.login("alice", "correct-horse", CLIENT).await.unwrap();

    let stored = h.accounts.snapshot(account.id).unwrap().unwrap();
    assert_ne!(stored.password_hash, account.password_hash);
    assert!(stored.password_hash.contains("t=2"));
    assert!(upgraded.login("alice", "correct-horse", CLIENT).await.is_ok());
}

#[test]
fn test_login_service_rejects_unusable_hash_parameters() {
    let h = Harness::new();
    let mut broken = common::config();
    broken.password_hash_params.memory = 1;

    let result = belfast_auth::LoginService::new(h.env.clone(), std::sync::Arc::new(broken));
    assert!(matches!(result, Err(AuthError::Config(_))));
}
