//! Passkey ceremonies.
//!
//! Each ceremony is two requests that may land on different instances, so
//! the state between them is a persisted [`Challenge`]:
//!
//! ```text
//! begin_*  ──► Challenge { purpose, account?, challenge, state, expires_at }
//!                 │
//! finish_* ──► load ─► expired?  ─► delete, ChallengeExpired
//!                 │     mismatch? ─► ChallengeMismatch (left in place)
//!                 │     consume   ─► lost the race? ChallengeExpired
//!                 └──► provider verification ─► persist / create session
//! ```
//!
//! The challenge is consumed before verification, so a failed verification
//! cannot be retried against the same challenge.

use crate::config::AuthConfig;
use crate::constants::{USER_HANDLE_BYTES, audit_actions, login_methods};
use crate::environment::AuthContext;
use crate::error::{AuthError, Result};
use crate::providers::{
    AccountRepository, AuditEvent, AuditSink, AuthenticatorSelection, CeremonyStart,
    ChallengeStore, Clock, CredentialRepository, CredentialResponse, CredentialUse,
    DiscoverableResolver, RateLimiter, VerifiedLogin, WebAuthnProvider,
};
use crate::session::{LoginOutcome, SessionManager};
use crate::state::{
    Account, AccountId, Challenge, ChallengeId, ChallengePurpose, PasskeyCredential,
};
use crate::utils::{normalize_username, random_bytes, rate_limit_key};
use serde_json::Value;
use std::sync::Arc;

/// Client facts captured from the HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct ClientInfo<'a> {
    /// Remote address, with or without port.
    pub ip: &'a str,
    /// `User-Agent` header.
    pub user_agent: &'a str,
}

/// Drives passkey registration, passkey login and passkey management.
pub struct CeremonyCoordinator<E> {
    env: Arc<E>,
    config: Arc<AuthConfig>,
    sessions: SessionManager<E>,
}

impl<E> Clone for CeremonyCoordinator<E> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            config: Arc::clone(&self.config),
            sessions: self.sessions.clone(),
        }
    }
}

impl<E: AuthContext> CeremonyCoordinator<E> {
    /// Create a coordinator.
    #[must_use]
    pub fn new(env: Arc<E>, config: Arc<AuthConfig>) -> Self {
        let sessions = SessionManager::new(Arc::clone(&env), Arc::clone(&config));
        Self {
            env,
            config,
            sessions,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════

    /// Start registering a new passkey for a signed-in account.
    ///
    /// Existing credentials are excluded so the same authenticator cannot
    /// register twice. A pending registration for the account is replaced.
    ///
    /// # Returns
    ///
    /// Options to relay to `navigator.credentials.create`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Account not found → `AuthError::UserNotFound`
    /// - Account disabled → `AuthError::UserDisabled`
    /// - The provider or a store fails
    pub async fn begin_registration(
        &self,
        account_id: AccountId,
        selection: &AuthenticatorSelection,
    ) -> Result<Value> {
        let account = self.active_account(account_id).await?;
        let exclude: Vec<String> = self
            .env
            .credentials()
            .list_for_account(account.id)
            .await?
            .into_iter()
            .map(|credential| credential.credential_id)
            .collect();
        let user_handle = self.user_handle(&account).await?;

        let start = self
            .env
            .webauthn()
            .begin_registration(&account, &user_handle, &exclude, selection)
            .await?;

        tracing::debug!(
            account_id = %account.id,
            excluded = exclude.len(),
            "Passkey registration started"
        );
        self.store_challenge(Some(account.id), ChallengePurpose::Register, start)
            .await
    }

    /// Finish registering a passkey.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Malformed response → `AuthError::InvalidRequest`
    /// - Too many attempts → `AuthError::RateLimited`
    /// - No live registration challenge → `AuthError::ChallengeExpired`
    /// - Client data echoes another challenge → `AuthError::ChallengeMismatch`
    /// - Credential id already registered → `AuthError::CredentialExists`
    /// - Attestation rejected, or attested id differs from the submitted one →
    ///   `AuthError::WebAuthnVerificationFailed`
    pub async fn finish_registration(
        &self,
        account_id: AccountId,
        response: Value,
        label: Option<&str>,
        client: ClientInfo<'_>,
    ) -> Result<PasskeyCredential> {
        let response = CredentialResponse::from_json(response)?;
        let embedded = response.challenge()?;

        let key = rate_limit_key(client.ip, Some(&account_id.to_string()));
        self.limit(&key).await?;

        let challenge = self
            .env
            .challenges()
            .get_for_account(account_id, ChallengePurpose::Register)
            .await?
            .ok_or(AuthError::ChallengeExpired)?;
        if let Err(e) = self.claim(&challenge, &embedded).await {
            if e == AuthError::ChallengeMismatch {
                self.registration_failed(account_id, &response.credential_id, "challenge_mismatch");
            }
            return Err(e);
        }

        if self
            .env
            .credentials()
            .get(&response.credential_id)
            .await?
            .is_some()
        {
            tracing::warn!(account_id = %account_id, "Passkey already registered");
            return Err(AuthError::CredentialExists);
        }

        let verified = match self
            .env
            .webauthn()
            .finish_registration(&challenge.state, &response)
            .await
        {
            Ok(verified) => verified,
            Err(e) if e.is_internal() => return Err(e),
            Err(e) => {
                self.registration_failed(account_id, &response.credential_id, "verification");
                return Err(e);
            }
        };

        // Stored id must be the one checked for duplicates
        if verified.credential_id != response.credential_id {
            self.registration_failed(account_id, &response.credential_id, "credential_id_mismatch");
            return Err(AuthError::WebAuthnVerificationFailed);
        }

        let now = self.env.clock().now();
        let credential = PasskeyCredential {
            credential_id: verified.credential_id,
            account_id,
            key_material: verified.key_material,
            sign_count: verified.sign_count,
            transports: response.transports(),
            attestation_type: verified.attestation_type,
            label: label
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(ToString::to_string),
            backup_eligible: verified.backup_eligible,
            backup_state: verified.backup_state,
            rp_id: self.config.webauthn_rp_id.clone(),
            created_at: now,
            last_used_at: None,
        };
        self.env.credentials().insert(&credential).await?;

        tracing::info!(account_id = %account_id, "Passkey registered");
        self.env.audit().record(
            AuditEvent::new(audit_actions::PASSKEY_ADD, now)
                .by(account_id)
                .with("credential_id", credential.credential_id.clone()),
        );
        Ok(credential)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Authentication
    // ═══════════════════════════════════════════════════════════════════

    /// Start a passkey login.
    ///
    /// With a username the ceremony is scoped to that account's passkeys;
    /// without one (or with a blank one) it is discoverable and the
    /// authenticator reports the account.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Named account not found → `AuthError::UserNotFound`
    /// - Named account disabled → `AuthError::UserDisabled`
    /// - Named account has no passkeys → `AuthError::PasskeyNotFound`
    /// - The provider or a store fails
    pub async fn begin_authentication(&self, username: Option<&str>) -> Result<Value> {
        let Some(username) = named(username) else {
            let start = self.env.webauthn().begin_discoverable_login().await?;
            tracing::debug!("Discoverable passkey login started");
            return self
                .store_challenge(None, ChallengePurpose::Authenticate, start)
                .await;
        };

        let account = self
            .env
            .accounts()
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if account.is_disabled() {
            return Err(AuthError::UserDisabled);
        }
        self.user_handle(&account).await?;

        let credentials = self.env.credentials().list_for_account(account.id).await?;
        if credentials.is_empty() {
            return Err(AuthError::PasskeyNotFound);
        }
        let start = self.env.webauthn().begin_login(&credentials).await?;

        tracing::debug!(account_id = %account.id, "Passkey login started");
        self.store_challenge(Some(account.id), ChallengePurpose::Authenticate, start)
            .await
    }

    /// Finish a passkey login and create a session.
    ///
    /// The discoverable path resolves the account only through the user
    /// handle the authenticator returns.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Malformed response → `AuthError::InvalidRequest`
    /// - Too many attempts → `AuthError::RateLimited`
    /// - No live challenge → `AuthError::ChallengeExpired`
    /// - Client data echoes another challenge → `AuthError::ChallengeMismatch`
    /// - Account disabled → `AuthError::UserDisabled`
    /// - Unknown credential, foreign credential or rejected assertion →
    ///   `AuthError::WebAuthnVerificationFailed`
    pub async fn finish_authentication(
        &self,
        username: Option<&str>,
        response: Value,
        client: ClientInfo<'_>,
    ) -> Result<LoginOutcome> {
        let response = CredentialResponse::from_json(response)?;
        let embedded = response.challenge()?;

        let username = named(username);
        let key = rate_limit_key(client.ip, username.as_deref());
        self.limit(&key).await?;

        let (account, credential, verified) = match username {
            Some(username) => self.finish_named(&username, &response, &embedded).await?,
            None => self.finish_discoverable(&response, &embedded).await?,
        };

        let now = self.env.clock().now();
        self.env
            .credentials()
            .record_use(
                &credential.credential_id,
                CredentialUse {
                    sign_count: verified.sign_count,
                    backup_eligible: verified.backup_eligible,
                    backup_state: verified.backup_state,
                    key_material: verified.key_material,
                    used_at: now,
                },
            )
            .await?;
        self.env.accounts().update_last_login(account.id, now).await?;

        let session = self
            .sessions
            .create_session(account.id, client.ip, client.user_agent)
            .await?;
        let cookie = self.sessions.cookie(&session);

        tracing::info!(account_id = %account.id, method = login_methods::PASSKEY, "Login succeeded");
        self.env.audit().record(
            AuditEvent::new(audit_actions::LOGIN_SUCCESS, now)
                .by(account.id)
                .with("method", login_methods::PASSKEY)
                .with("credential_id", credential.credential_id),
        );

        Ok(LoginOutcome {
            account,
            session,
            cookie,
        })
    }

    async fn finish_named(
        &self,
        username: &str,
        response: &CredentialResponse,
        embedded: &str,
    ) -> Result<(Account, PasskeyCredential, VerifiedLogin)> {
        let account = self
            .env
            .accounts()
            .get_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if account.is_disabled() {
            return Err(AuthError::UserDisabled);
        }

        let challenge = self
            .env
            .challenges()
            .get_for_account(account.id, ChallengePurpose::Authenticate)
            .await?
            .ok_or(AuthError::ChallengeExpired)?;
        if let Err(e) = self.claim(&challenge, embedded).await {
            if e == AuthError::ChallengeMismatch {
                self.login_failed(Some(account.id), &response.credential_id, "challenge_mismatch");
            }
            return Err(e);
        }

        // The credential must belong to the account the challenge was issued for
        let credential = self
            .env
            .credentials()
            .get(&response.credential_id)
            .await?
            .filter(|credential| credential.account_id == account.id);
        let Some(credential) = credential else {
            self.login_failed(Some(account.id), &response.credential_id, "unknown_credential");
            return Err(AuthError::WebAuthnVerificationFailed);
        };

        match self
            .env
            .webauthn()
            .finish_login(&challenge.state, response, &credential)
            .await
        {
            Ok(verified) => Ok((account, credential, verified)),
            Err(e) => {
                self.login_failed(Some(account.id), &response.credential_id, "verification");
                Err(e)
            }
        }
    }

    async fn finish_discoverable(
        &self,
        response: &CredentialResponse,
        embedded: &str,
    ) -> Result<(Account, PasskeyCredential, VerifiedLogin)> {
        let challenge = self
            .env
            .challenges()
            .get_by_value(embedded, ChallengePurpose::Authenticate)
            .await?
            .filter(|challenge| challenge.account_id.is_none())
            .ok_or(AuthError::ChallengeExpired)?;
        if let Err(e) = self.claim(&challenge, embedded).await {
            if e == AuthError::ChallengeMismatch {
                self.login_failed(None, &response.credential_id, "challenge_mismatch");
            }
            return Err(e);
        }

        let resolver = HandleResolver { env: &*self.env };
        match self
            .env
            .webauthn()
            .finish_discoverable_login(&challenge.state, response, &resolver)
            .await
        {
            Ok(discovered) => Ok((discovered.account, discovered.credential, discovered.verified)),
            Err(AuthError::UserDisabled) => Err(AuthError::UserDisabled),
            Err(e) if e.is_internal() => Err(e),
            Err(_) => {
                self.login_failed(None, &response.credential_id, "verification");
                Err(AuthError::WebAuthnVerificationFailed)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Management
    // ═══════════════════════════════════════════════════════════════════

    /// Passkeys registered to an account, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list_passkeys(&self, account_id: AccountId) -> Result<Vec<PasskeyCredential>> {
        self.env.credentials().list_for_account(account_id).await
    }

    /// Delete one of the account's passkeys.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The account owns no such passkey → `AuthError::PasskeyNotFound`
    /// - The store fails
    pub async fn delete_passkey(&self, account_id: AccountId, credential_id: &str) -> Result<()> {
        if !self
            .env
            .credentials()
            .delete(account_id, credential_id)
            .await?
        {
            return Err(AuthError::PasskeyNotFound);
        }

        tracing::info!(account_id = %account_id, "Passkey removed");
        self.env.audit().record(
            AuditEvent::new(audit_actions::PASSKEY_REMOVE, self.env.clock().now())
                .by(account_id)
                .with("credential_id", credential_id),
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════

    async fn active_account(&self, account_id: AccountId) -> Result<Account> {
        let account = self
            .env
            .accounts()
            .get_by_id(account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if account.is_disabled() {
            return Err(AuthError::UserDisabled);
        }
        Ok(account)
    }

    async fn user_handle(&self, account: &Account) -> Result<Vec<u8>> {
        if let Some(handle) = account.webauthn_user_handle.clone() {
            return Ok(handle);
        }
        self.env
            .accounts()
            .ensure_user_handle(account.id, random_bytes(USER_HANDLE_BYTES))
            .await
    }

    async fn limit(&self, key: &str) -> Result<()> {
        self.env
            .rate_limiter()
            .check_and_record(
                key,
                self.config.rate_limit_passkey_max,
                self.config.rate_limit_window(),
            )
            .await
    }

    async fn store_challenge(
        &self,
        account_id: Option<AccountId>,
        purpose: ChallengePurpose,
        start: CeremonyStart,
    ) -> Result<Value> {
        let now = self.env.clock().now();
        let challenge = Challenge {
            id: ChallengeId::new(),
            account_id,
            purpose,
            challenge: start.challenge,
            state: start.state,
            created_at: now,
            expires_at: now + self.config.challenge_ttl(),
        };
        self.env.challenges().put(&challenge).await?;
        Ok(start.options)
    }

    /// Validate and consume a loaded challenge.
    async fn claim(&self, challenge: &Challenge, embedded: &str) -> Result<()> {
        if challenge.is_expired(self.env.clock().now()) {
            self.env.challenges().consume(challenge.id).await?;
            tracing::warn!(purpose = %challenge.purpose, "Challenge expired");
            return Err(AuthError::ChallengeExpired);
        }

        if !constant_time_eq::constant_time_eq(challenge.challenge.as_bytes(), embedded.as_bytes()) {
            tracing::warn!(purpose = %challenge.purpose, "Challenge mismatch");
            return Err(AuthError::ChallengeMismatch);
        }

        if !self.env.challenges().consume(challenge.id).await? {
            tracing::warn!(purpose = %challenge.purpose, "Challenge already consumed");
            return Err(AuthError::ChallengeExpired);
        }
        Ok(())
    }

    fn registration_failed(&self, account_id: AccountId, credential_id: &str, reason: &str) {
        tracing::warn!(account_id = %account_id, reason, "Passkey registration rejected");
        self.env.audit().record(
            AuditEvent::new(audit_actions::PASSKEY_ADD_FAIL, self.env.clock().now())
                .by(account_id)
                .with("credential_id", credential_id)
                .with("reason", reason),
        );
    }

    fn login_failed(&self, account_id: Option<AccountId>, credential_id: &str, reason: &str) {
        tracing::warn!(reason, "Passkey login failed");
        let mut event = AuditEvent::new(audit_actions::PASSKEY_LOGIN_FAIL, self.env.clock().now())
            .with("credential_id", credential_id)
            .with("reason", reason);
        event.target = account_id;
        self.env.audit().record(event);
    }
}

/// Loads accounts by user handle during discoverable login.
struct HandleResolver<'a, E> {
    env: &'a E,
}

impl<E: AuthContext> DiscoverableResolver for HandleResolver<'_, E> {
    async fn resolve(&self, user_handle: &[u8]) -> Result<(Account, Vec<PasskeyCredential>)> {
        let account = self
            .env
            .accounts()
            .get_by_user_handle(user_handle)
            .await?
            .ok_or(AuthError::WebAuthnVerificationFailed)?;
        if account.is_disabled() {
            return Err(AuthError::UserDisabled);
        }
        let credentials = self.env.credentials().list_for_account(account.id).await?;
        Ok((account, credentials))
    }
}

fn named(username: Option<&str>) -> Option<String> {
    username
        .map(normalize_username)
        .filter(|username| !username.is_empty())
}
