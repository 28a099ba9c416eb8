//! Identity state types.
//!
//! This module defines the persisted records the identity core reads and
//! writes through its providers. All types are `Clone` and serializable so
//! that any store can hold them.

use crate::constants::purposes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub uuid::Uuid);

impl AccountId {
    /// Generate a new random `AccountId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a session.
///
/// The value is the opaque cookie payload: 256 random bits, base64url encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new cryptographically secure random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(crate::utils::random_token(32))
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix safe to include in logs.
    #[must_use]
    pub fn redacted(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a pending challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId(pub uuid::Uuid);

impl ChallengeId {
    /// Generate a new random `ChallengeId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════

/// Identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account id.
    pub id: AccountId,

    /// Username as entered at creation.
    pub username: Option<String>,

    /// Case and whitespace folded username, unique among accounts.
    pub username_normalized: Option<String>,

    /// Self-describing password hash (PHC string).
    pub password_hash: String,

    /// Algorithm tag the hash was produced with.
    pub password_algorithm: String,

    /// Administrator flag.
    pub is_admin: bool,

    /// Set when the account has been disabled.
    pub disabled_at: Option<DateTime<Utc>>,

    /// Stable WebAuthn user handle, generated lazily on first ceremony.
    pub webauthn_user_handle: Option<Vec<u8>>,

    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create an active account with a username and password hash.
    #[must_use]
    pub fn new(
        username: &str,
        password_hash: String,
        password_algorithm: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            username: Some(username.trim().to_string()),
            username_normalized: Some(crate::utils::normalize_username(username)),
            password_hash,
            password_algorithm,
            is_admin: false,
            disabled_at: None,
            webauthn_user_handle: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the account has been disabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }

    /// Name presented to authenticators.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// A registered authenticator bound to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasskeyCredential {
    /// Credential id (base64url, globally unique).
    pub credential_id: String,

    /// Owning account.
    pub account_id: AccountId,

    /// Public key material as serialized by the ceremony provider.
    pub key_material: serde_json::Value,

    /// Signature counter reported at the last ceremony.
    pub sign_count: u32,

    /// Transports the authenticator advertised.
    pub transports: Vec<String>,

    /// Attestation format recorded at registration.
    pub attestation_type: String,

    /// Optional human label.
    pub label: Option<String>,

    /// Backup eligibility flag, when known.
    pub backup_eligible: Option<bool>,

    /// Backup state flag, when known.
    pub backup_state: Option<bool>,

    /// Relying party id the credential was registered under.
    pub rp_id: String,

    /// Registration timestamp.
    pub created_at: DateTime<Utc>,

    /// Last successful authentication.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// An authenticated browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session id (cookie value).
    pub id: SessionId,

    /// Owning account.
    pub account_id: AccountId,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last request seen on this session.
    pub last_seen_at: DateTime<Utc>,

    /// Session expiry.
    pub expires_at: DateTime<Utc>,

    /// Client IP at creation. Forensic only.
    pub ip_address: String,

    /// User agent at creation. Forensic only.
    pub user_agent: String,

    /// Double-submit CSRF token. Empty until issued.
    pub csrf_token: String,

    /// CSRF token expiry.
    pub csrf_expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` once `now` has reached the session expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the CSRF token is present and unexpired.
    #[must_use]
    pub fn csrf_is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.csrf_token.is_empty() && now < self.csrf_expires_at
    }
}

/// Ceremony a challenge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengePurpose {
    /// Passkey registration.
    #[serde(rename = "webauthn.register")]
    Register,

    /// Passkey authentication.
    #[serde(rename = "webauthn.auth")]
    Authenticate,
}

impl ChallengePurpose {
    /// Persisted purpose tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => purposes::WEBAUTHN_REGISTER,
            Self::Authenticate => purposes::WEBAUTHN_AUTH,
        }
    }
}

impl fmt::Display for ChallengePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight ceremony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Challenge row id.
    pub id: ChallengeId,

    /// Owning account; `None` for discoverable login.
    pub account_id: Option<AccountId>,

    /// Ceremony purpose.
    pub purpose: ChallengePurpose,

    /// Literal challenge presented to the authenticator (base64url).
    pub challenge: String,

    /// Opaque ceremony state needed to finish.
    pub state: serde_json::Value,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// Returns `true` once `now` is past the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry_and_csrf_freshness() {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            account_id: AccountId::new(),
            created_at: now,
            last_seen_at: now,
            expires_at: now + Duration::hours(1),
            ip_address: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            csrf_token: String::new(),
            csrf_expires_at: now + Duration::minutes(30),
        };

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(1)));
        assert!(!session.csrf_is_fresh(now), "empty token is never fresh");

        let session = Session {
            csrf_token: "token".to_string(),
            ..session
        };
        assert!(session.csrf_is_fresh(now));
        assert!(!session.csrf_is_fresh(now + Duration::minutes(30)));
    }

    #[test]
    fn test_session_ids_are_unique_and_redacted() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert_eq!(a.redacted().len(), 8);
        assert_eq!(a.as_str().len(), 43);
    }

    #[test]
    fn test_purpose_serializes_as_tag() {
        let json = serde_json::to_string(&ChallengePurpose::Register).unwrap();
        assert_eq!(json, "\"webauthn.register\"");
        assert_eq!(ChallengePurpose::Authenticate.to_string(), "webauthn.auth");
    }

    #[test]
    fn test_account_new_normalizes_username() {
        let account = Account::new("  Alice ", "hash".into(), "argon2id".into(), Utc::now());
        assert_eq!(account.username.as_deref(), Some("Alice"));
        assert_eq!(account.username_normalized.as_deref(), Some("alice"));
        assert!(!account.is_disabled());
    }
}
