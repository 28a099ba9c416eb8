//! Session lifecycle and cookies.
//!
//! A session is an opaque random id persisted through the [`SessionStore`];
//! the cookie carries only that id. CSRF tokens live on the session row but
//! expire on their own, shorter schedule and are issued lazily.
//!
//! [`SessionStore`]: crate::providers::SessionStore

use crate::config::{AuthConfig, SameSite};
use crate::constants::CSRF_TOKEN_BYTES;
use crate::environment::AuthContext;
use crate::error::{AuthError, Result};
use crate::providers::{AccountRepository, Clock, SessionStore};
use crate::state::{Account, AccountId, Session, SessionId};
use crate::utils::random_token;
use chrono::{DateTime, Utc};
use cookie::Cookie;
use std::sync::Arc;
use time::OffsetDateTime;

/// A `Set-Cookie` value for the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (the session id, or empty when clearing).
    pub value: String,
    /// Cookie path.
    pub path: String,
    /// `HttpOnly` attribute.
    pub http_only: bool,
    /// `Secure` attribute.
    pub secure: bool,
    /// `SameSite` attribute.
    pub same_site: SameSite,
    /// `Max-Age` in seconds. Zero clears the cookie.
    pub max_age: i64,
    /// `Expires` attribute.
    pub expires: DateTime<Utc>,
}

impl SessionCookie {
    /// Build the cookie for a response.
    #[must_use]
    pub fn to_cookie(&self) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site.into())
            .max_age(time::Duration::seconds(self.max_age.max(0)));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(self.expires.timestamp()) {
            builder = builder.expires(expires);
        }
        builder.build()
    }

    /// Render the `Set-Cookie` header value.
    ///
    /// # Examples
    ///
    /// ```
    /// # use belfast_auth::config::AuthConfig;
    /// # use belfast_auth::session::clear_session_cookie;
    /// let header = clear_session_cookie(&AuthConfig::default()).to_header_value();
    /// assert!(header.starts_with("belfast_session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0;"));
    /// ```
    #[must_use]
    pub fn to_header_value(&self) -> String {
        self.to_cookie().to_string()
    }
}

/// Cookie carrying `session`, expiring with it.
#[must_use]
pub fn build_session_cookie(config: &AuthConfig, session: &Session, now: DateTime<Utc>) -> SessionCookie {
    SessionCookie {
        name: config.cookie_name.clone(),
        value: session.id.as_str().to_string(),
        path: "/".to_string(),
        http_only: true,
        secure: config.cookie_secure,
        same_site: config.cookie_same_site,
        max_age: (session.expires_at - now).num_seconds(),
        expires: session.expires_at,
    }
}

/// Cookie that makes the browser drop the session cookie.
#[must_use]
pub fn clear_session_cookie(config: &AuthConfig) -> SessionCookie {
    SessionCookie {
        name: config.cookie_name.clone(),
        value: String::new(),
        path: "/".to_string(),
        http_only: true,
        secure: config.cookie_secure,
        same_site: config.cookie_same_site,
        max_age: 0,
        expires: DateTime::UNIX_EPOCH,
    }
}

/// Result of a successful login, password or passkey.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    /// Authenticated account.
    pub account: Account,
    /// Newly created session.
    pub session: Session,
    /// Cookie to set on the response.
    pub cookie: SessionCookie,
}

/// Creates, loads and revokes sessions.
pub struct SessionManager<E> {
    env: Arc<E>,
    config: Arc<AuthConfig>,
}

impl<E> Clone for SessionManager<E> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            config: Arc::clone(&self.config),
        }
    }
}

impl<E: AuthContext> SessionManager<E> {
    /// Create a session manager.
    #[must_use]
    pub const fn new(env: Arc<E>, config: Arc<AuthConfig>) -> Self {
        Self { env, config }
    }

    /// Create and persist a session for `account_id`.
    ///
    /// The CSRF token starts empty and is issued by [`Self::ensure_csrf`].
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn create_session(
        &self,
        account_id: AccountId,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<Session> {
        let now = self.env.clock().now();
        let session = Session {
            id: SessionId::new(),
            account_id,
            created_at: now,
            last_seen_at: now,
            expires_at: now + self.config.session_ttl(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            csrf_token: String::new(),
            csrf_expires_at: now,
        };

        self.env.sessions().create(&session).await?;
        tracing::debug!(
            account_id = %account_id,
            session = session.id.redacted(),
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// Cookie for `session` as of now.
    #[must_use]
    pub fn cookie(&self, session: &Session) -> SessionCookie {
        build_session_cookie(&self.config, session, self.env.clock().now())
    }

    /// Resolve a session id to a live session and its account.
    ///
    /// Expired sessions are deleted on sight.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Session is missing or expired → `AuthError::SessionNotFound`
    /// - Its account no longer exists → `AuthError::SessionNotFound`
    /// - Its account is disabled → `AuthError::UserDisabled`
    /// - A store fails
    pub async fn load(&self, session_id: &SessionId) -> Result<(Session, Account)> {
        let session = self
            .env
            .sessions()
            .get(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_expired(self.env.clock().now()) {
            tracing::debug!(session = session_id.redacted(), "Session expired");
            self.env.sessions().delete(session_id).await?;
            return Err(AuthError::SessionNotFound);
        }

        let account = self
            .env
            .accounts()
            .get_by_id(session.account_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if account.is_disabled() {
            return Err(AuthError::UserDisabled);
        }

        Ok((session, account))
    }

    /// Issue a new CSRF token for the session.
    ///
    /// The session's own expiry is left untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the session is gone or the store fails.
    pub async fn refresh_csrf(&self, session_id: &SessionId) -> Result<(String, DateTime<Utc>)> {
        let token = random_token(CSRF_TOKEN_BYTES);
        let expires_at = self.env.clock().now() + self.config.csrf_ttl();
        self.env
            .sessions()
            .update_csrf(session_id, &token, expires_at)
            .await?;
        Ok((token, expires_at))
    }

    /// Return the session's CSRF token, refreshing it when empty or expired.
    ///
    /// # Errors
    ///
    /// Returns error if a refresh is needed and fails.
    pub async fn ensure_csrf(&self, session: &mut Session) -> Result<String> {
        if !session.csrf_is_fresh(self.env.clock().now()) {
            let (token, expires_at) = self.refresh_csrf(&session.id).await?;
            session.csrf_token = token;
            session.csrf_expires_at = expires_at;
        }
        Ok(session.csrf_token.clone())
    }

    /// Check a token echoed back by the client against the session.
    ///
    /// Comparison is constant-time; stale tokens never match.
    #[must_use]
    pub fn verify_csrf(&self, session: &Session, presented: &str) -> bool {
        session.csrf_is_fresh(self.env.clock().now())
            && constant_time_eq::constant_time_eq(session.csrf_token.as_bytes(), presented.as_bytes())
    }

    /// Record activity on the session.
    ///
    /// With sliding sessions, expiry moves to now + TTL when that is later.
    ///
    /// # Returns
    ///
    /// `true` if the expiry moved and the cookie should be re-issued.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn touch(&self, session: &mut Session) -> Result<bool> {
        let now = self.env.clock().now();
        let extended = Some(now + self.config.session_ttl())
            .filter(|expires_at| self.config.session_sliding && *expires_at > session.expires_at);

        self.env.sessions().touch(&session.id, now, extended).await?;
        session.last_seen_at = now;
        if let Some(expires_at) = extended {
            session.expires_at = expires_at;
        }
        Ok(extended.is_some())
    }

    /// Delete one session.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn revoke_session(&self, session_id: &SessionId) -> Result<()> {
        self.env.sessions().delete(session_id).await?;
        tracing::debug!(session = session_id.redacted(), "Session revoked");
        Ok(())
    }

    /// Delete every session of `account_id` except `except`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn revoke_sessions(
        &self,
        account_id: AccountId,
        except: Option<&SessionId>,
    ) -> Result<usize> {
        let revoked = self
            .env
            .sessions()
            .delete_for_account(account_id, except)
            .await?;
        tracing::info!(account_id = %account_id, revoked, "Sessions revoked");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(now: DateTime<Utc>) -> Session {
        Session {
            id: SessionId::from("abcdefghijkl"),
            account_id: AccountId::new(),
            created_at: now,
            last_seen_at: now,
            expires_at: now + Duration::hours(24),
            ip_address: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            csrf_token: String::new(),
            csrf_expires_at: now,
        }
    }

    #[test]
    fn test_session_cookie_header() {
        let now = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let config = AuthConfig::default().with_cookie("sid", true, SameSite::Strict);
        let cookie = build_session_cookie(&config, &session(now), now);

        assert_eq!(cookie.max_age, 86_400);
        assert_eq!(
            cookie.to_header_value(),
            "sid=abcdefghijkl; HttpOnly; SameSite=Strict; Secure; Path=/; Max-Age=86400; \
             Expires=Tue, 02 Jan 2024 00:00:00 GMT"
        );
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&AuthConfig::default());
        assert_eq!(cookie.value, "");
        assert_eq!(
            cookie.to_header_value(),
            "belfast_session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; \
             Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
    }
}
