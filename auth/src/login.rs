//! Password login, logout and password change.

use crate::ceremony::ClientInfo;
use crate::config::AuthConfig;
use crate::constants::{audit_actions, login_methods};
use crate::environment::AuthContext;
use crate::error::{AuthError, Result};
use crate::password::PasswordAuthenticator;
use crate::providers::{AccountRepository, AuditEvent, AuditSink, Clock, RateLimiter, SessionStore};
use crate::session::{LoginOutcome, SessionCookie, SessionManager, clear_session_cookie};
use crate::state::{Account, AccountId, SessionId};
use crate::utils::{normalize_username, rate_limit_key};
use std::sync::Arc;

/// Password login and account credential changes.
pub struct LoginService<E> {
    env: Arc<E>,
    config: Arc<AuthConfig>,
    passwords: PasswordAuthenticator,
    sessions: SessionManager<E>,
}

impl<E> Clone for LoginService<E> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            config: Arc::clone(&self.config),
            passwords: self.passwords.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

impl<E: AuthContext> LoginService<E> {
    /// Create a login service.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the password hashing parameters are unusable.
    pub fn new(env: Arc<E>, config: Arc<AuthConfig>) -> Result<Self> {
        let passwords = PasswordAuthenticator::new(&config)?;
        let sessions = SessionManager::new(Arc::clone(&env), Arc::clone(&config));
        Ok(Self {
            env,
            config,
            passwords,
            sessions,
        })
    }

    /// Password hasher used by this service.
    #[must_use]
    pub const fn passwords(&self) -> &PasswordAuthenticator {
        &self.passwords
    }

    /// Session manager used by this service.
    #[must_use]
    pub const fn sessions(&self) -> &SessionManager<E> {
        &self.sessions
    }

    /// Authenticate with username and password and create a session.
    ///
    /// Unknown usernames run a dummy verification so they cost the same
    /// as a wrong password and fail with the same error.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Username blank → `AuthError::UsernameRequired`
    /// - Too many attempts → `AuthError::RateLimited`
    /// - Unknown username or wrong password → `AuthError::InvalidCredentials`
    /// - Account disabled → `AuthError::UserDisabled`
    /// - A store fails
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientInfo<'_>,
    ) -> Result<LoginOutcome> {
        let normalized = normalize_username(username);
        if normalized.is_empty() {
            return Err(AuthError::UsernameRequired);
        }

        let key = rate_limit_key(client.ip, Some(&normalized));
        self.env
            .rate_limiter()
            .check_and_record(
                &key,
                self.config.rate_limit_login_max,
                self.config.rate_limit_window(),
            )
            .await?;

        let Some(account) = self.env.accounts().get_by_username(&normalized).await? else {
            self.passwords.verify_dummy(password);
            self.login_failed(None, &normalized, "unknown_user");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .passwords
            .verify(password, &account.password_hash, &account.password_algorithm)
        {
            self.login_failed(Some(account.id), &normalized, "wrong_password");
            return Err(AuthError::InvalidCredentials);
        }

        if account.is_disabled() {
            self.login_failed(Some(account.id), &normalized, "disabled");
            return Err(AuthError::UserDisabled);
        }

        self.upgrade_hash(&account, password).await;

        let now = self.env.clock().now();
        self.env.accounts().update_last_login(account.id, now).await?;
        let session = self
            .sessions
            .create_session(account.id, client.ip, client.user_agent)
            .await?;
        let cookie = self.sessions.cookie(&session);

        tracing::info!(account_id = %account.id, method = login_methods::PASSWORD, "Login succeeded");
        self.env.audit().record(
            AuditEvent::new(audit_actions::LOGIN_SUCCESS, now)
                .by(account.id)
                .with("method", login_methods::PASSWORD)
                .with("username", normalized),
        );

        Ok(LoginOutcome {
            account,
            session,
            cookie,
        })
    }

    /// Revoke the current session.
    ///
    /// # Returns
    ///
    /// A cookie that clears the session cookie, whether or not the session
    /// still existed.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn logout(&self, session_id: &SessionId) -> Result<SessionCookie> {
        let owner = self
            .env
            .sessions()
            .get(session_id)
            .await?
            .map(|session| session.account_id);
        self.sessions.revoke_session(session_id).await?;

        if let Some(account_id) = owner {
            self.env.audit().record(
                AuditEvent::new(audit_actions::LOGOUT, self.env.clock().now()).by(account_id),
            );
        }
        Ok(clear_session_cookie(&self.config))
    }

    /// Change the account's password and sign out every other session.
    ///
    /// # Returns
    ///
    /// Number of sessions revoked.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Account not found → `AuthError::UserNotFound`
    /// - Current password wrong → `AuthError::InvalidCredentials`
    /// - New password outside bounds → `AuthError::PasswordTooShort` / `PasswordTooLong`
    /// - A store fails
    pub async fn change_password(
        &self,
        account_id: AccountId,
        current_session: &SessionId,
        current_password: &str,
        new_password: &str,
    ) -> Result<usize> {
        let account = self
            .env
            .accounts()
            .get_by_id(account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !self.passwords.verify(
            current_password,
            &account.password_hash,
            &account.password_algorithm,
        ) {
            return Err(AuthError::InvalidCredentials);
        }

        let hashed = self.passwords.hash(new_password)?;
        let now = self.env.clock().now();
        self.env
            .accounts()
            .update_password(account_id, &hashed.hash, &hashed.algorithm, now)
            .await?;
        let revoked = self
            .sessions
            .revoke_sessions(account_id, Some(current_session))
            .await?;

        self.env.audit().record(
            AuditEvent::new(audit_actions::PASSWORD_CHANGE, now)
                .by(account_id)
                .with("sessions_revoked", revoked),
        );
        Ok(revoked)
    }

    /// Re-hash with current parameters. Never fails the login.
    async fn upgrade_hash(&self, account: &Account, password: &str) {
        if !self
            .passwords
            .needs_rehash(&account.password_hash, &account.password_algorithm)
        {
            return;
        }

        let result = match self.passwords.hash(password) {
            Ok(hashed) => {
                self.env
                    .accounts()
                    .update_password(
                        account.id,
                        &hashed.hash,
                        &hashed.algorithm,
                        self.env.clock().now(),
                    )
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => tracing::info!(account_id = %account.id, "Password hash upgraded"),
            Err(e) => tracing::warn!(account_id = %account.id, error = %e, "Password hash upgrade failed"),
        }
    }

    fn login_failed(&self, account_id: Option<AccountId>, username: &str, reason: &str) {
        tracing::warn!(reason, "Login failed");
        let mut event = AuditEvent::new(audit_actions::LOGIN_FAIL, self.env.clock().now())
            .with("username", username)
            .with("reason", reason);
        event.target = account_id;
        self.env.audit().record(event);
    }
}
