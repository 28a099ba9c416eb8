//! Error types for authentication and session operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the identity and session core.
///
/// Every variant maps to a stable string code (see [`AuthError::code`])
/// that the HTTP layer translates into a transport status. Authentication
/// failures deliberately collapse onto generic codes so that responses do
/// not reveal whether an account or credential exists.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Input Validation
    // ═══════════════════════════════════════════════════════════

    /// Username was empty after normalization.
    #[error("Username required")]
    UsernameRequired,

    /// Request payload could not be interpreted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Password shorter than the configured minimum.
    #[error("Password too short")]
    PasswordTooShort,

    /// Password longer than the configured maximum.
    #[error("Password too long")]
    PasswordTooLong,

    // ═══════════════════════════════════════════════════════════
    // Authentication Failures
    // ═══════════════════════════════════════════════════════════

    /// Unknown account or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Challenge embedded in client data does not match the stored one.
    ///
    /// Reported to callers with the same code as a verification failure.
    #[error("Challenge mismatch")]
    ChallengeMismatch,

    /// Ceremony verification rejected the authenticator response.
    #[error("WebAuthn verification failed")]
    WebAuthnVerificationFailed,

    // ═══════════════════════════════════════════════════════════
    // State Errors
    // ═══════════════════════════════════════════════════════════

    /// Account exists but has been disabled.
    #[error("User disabled")]
    UserDisabled,

    /// No account matches the supplied username.
    #[error("User not found")]
    UserNotFound,

    /// Challenge is missing, already consumed, or past its expiry.
    #[error("Challenge expired")]
    ChallengeExpired,

    /// Credential id is already registered (to any account).
    #[error("Credential already exists")]
    CredentialExists,

    /// No passkey matches the request.
    #[error("Passkey not found")]
    PasskeyNotFound,

    /// Session missing, revoked, or expired.
    #[error("Session not found")]
    SessionNotFound,

    /// Relying party settings are incomplete.
    #[error("WebAuthn not configured")]
    WebAuthnNotConfigured,

    // ═══════════════════════════════════════════════════════════
    // Abuse Control
    // ═══════════════════════════════════════════════════════════

    /// Too many attempts for this key within the window.
    #[error("Too many attempts, please retry after {retry_after:?}")]
    RateLimited {
        /// Duration to wait before retrying
        retry_after: std::time::Duration,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Configuration could not be parsed or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store or internal failure. The detail is for logs only.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Stable identifier surfaced to callers.
    ///
    /// # Examples
    ///
    /// ```
    /// # use belfast_auth::AuthError;
    /// assert_eq!(AuthError::InvalidCredentials.code(), "auth.invalid_credentials");
    /// assert_eq!(AuthError::ChallengeMismatch.code(), "auth.webauthn_verification_failed");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UsernameRequired => "auth.username_required",
            Self::InvalidRequest(_) => "bad_request",
            Self::PasswordTooShort => "auth.password_too_short",
            Self::PasswordTooLong => "auth.password_too_long",
            Self::InvalidCredentials => "auth.invalid_credentials",
            Self::ChallengeMismatch | Self::WebAuthnVerificationFailed => {
                "auth.webauthn_verification_failed"
            }
            Self::UserDisabled => "auth.user_disabled",
            Self::UserNotFound => "auth.user_not_found",
            Self::ChallengeExpired => "auth.challenge_expired",
            Self::CredentialExists => "auth.credential_exists",
            Self::PasskeyNotFound => "auth.passkey_not_found",
            Self::SessionNotFound => "auth.session_missing",
            Self::WebAuthnNotConfigured => "auth.webauthn_not_configured",
            Self::RateLimited { .. } => "auth.rate_limited",
            Self::Config(_) => "config_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Internal errors never echo the underlying storage error text.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InternalError(_) | Self::Config(_) => "internal error".to_string(),
            Self::ChallengeMismatch => Self::WebAuthnVerificationFailed.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use belfast_auth::AuthError;
    /// assert!(AuthError::PasswordTooShort.is_user_error());
    /// assert!(!AuthError::InternalError("db".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UsernameRequired
                | Self::InvalidRequest(_)
                | Self::PasswordTooShort
                | Self::PasswordTooLong
                | Self::InvalidCredentials
        )
    }

    /// Returns `true` if this error indicates a possible attack.
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(
            self,
            Self::ChallengeMismatch
                | Self::WebAuthnVerificationFailed
                | Self::RateLimited { .. }
        )
    }

    /// Returns `true` for store and internal failures.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InternalError(_) | Self::Config(_))
    }

    /// Back-off hint for rate limited callers.
    #[must_use]
    pub const fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
