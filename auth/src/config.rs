//! Authentication configuration.
//!
//! [`AuthConfig`] holds every tunable of the identity core. Values should be
//! provided by the application (usually from the `[auth]` table of its TOML
//! configuration), not hardcoded. Missing or non-positive values fall back to
//! the defaults below after [`AuthConfig::normalize`].

use crate::error::{AuthError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 86_400;
const DEFAULT_CSRF_TOKEN_TTL_SECONDS: i64 = 7_200;
const DEFAULT_CHALLENGE_TTL_SECONDS: i64 = 300;
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 12;
const DEFAULT_PASSWORD_MAX_LENGTH: usize = 128;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: i64 = 60;
const DEFAULT_RATE_LIMIT_LOGIN_MAX: u32 = 5;
const DEFAULT_RATE_LIMIT_PASSKEY_MAX: u32 = 5;
const DEFAULT_COOKIE_NAME: &str = "belfast_session";

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// `SameSite=Lax`
    #[default]
    Lax,
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=None` (requires `Secure` in browsers)
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Lax => Self::Lax,
            SameSite::Strict => Self::Strict,
            SameSite::None => Self::None,
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub memory: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
    /// Salt length in bytes.
    pub salt_length: u32,
    /// Derived key length in bytes.
    pub key_length: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory: 65_536,
            iterations: 3,
            parallelism: 1,
            salt_length: 16,
            key_length: 32,
        }
    }
}

impl Argon2Params {
    fn normalize(&mut self) {
        let defaults = Self::default();
        if self.memory == 0 {
            self.memory = defaults.memory;
        }
        if self.iterations == 0 {
            self.iterations = defaults.iterations;
        }
        if self.parallelism == 0 {
            self.parallelism = defaults.parallelism;
        }
        if self.salt_length == 0 {
            self.salt_length = defaults.salt_length;
        }
        if self.key_length == 0 {
            self.key_length = defaults.key_length;
        }
    }
}

/// Identity and session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session lifetime from creation (or last touch when sliding).
    ///
    /// Default: 24 hours
    pub session_ttl_seconds: i64,

    /// Extend session expiry on activity.
    pub session_sliding: bool,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Emit the `Secure` cookie attribute.
    pub cookie_secure: bool,

    /// `SameSite` cookie attribute.
    pub cookie_same_site: SameSite,

    /// CSRF token lifetime, independent of the session.
    ///
    /// Default: 2 hours
    pub csrf_token_ttl_seconds: i64,

    /// Minimum password length in characters.
    pub password_min_length: usize,

    /// Maximum password length in characters.
    pub password_max_length: usize,

    /// Argon2id cost parameters for new hashes.
    pub password_hash_params: Argon2Params,

    /// WebAuthn relying party id (e.g. `"admin.example.com"`).
    pub webauthn_rp_id: String,

    /// WebAuthn relying party display name.
    pub webauthn_rp_name: String,

    /// Origins accepted in client data. The first one is the primary origin.
    pub webauthn_expected_origins: Vec<String>,

    /// Lifetime of a pending ceremony challenge.
    ///
    /// Default: 5 minutes
    pub webauthn_challenge_ttl_seconds: i64,

    /// Sliding rate-limit window.
    pub rate_limit_window_seconds: i64,

    /// Password login attempts allowed per window and key.
    pub rate_limit_login_max: u32,

    /// Passkey ceremony attempts allowed per window and key.
    pub rate_limit_passkey_max: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_sliding: false,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_secure: false,
            cookie_same_site: SameSite::Lax,
            csrf_token_ttl_seconds: DEFAULT_CSRF_TOKEN_TTL_SECONDS,
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            password_max_length: DEFAULT_PASSWORD_MAX_LENGTH,
            password_hash_params: Argon2Params::default(),
            webauthn_rp_id: String::new(),
            webauthn_rp_name: String::new(),
            webauthn_expected_origins: Vec::new(),
            webauthn_challenge_ttl_seconds: DEFAULT_CHALLENGE_TTL_SECONDS,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            rate_limit_login_max: DEFAULT_RATE_LIMIT_LOGIN_MAX,
            rate_limit_passkey_max: DEFAULT_RATE_LIMIT_PASSKEY_MAX,
        }
    }
}

impl AuthConfig {
    /// Parse a configuration from TOML and normalize it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the document is not valid TOML or
    /// a field has the wrong type.
    ///
    /// # Examples
    ///
    /// ```
    /// # use belfast_auth::config::AuthConfig;
    /// let config = AuthConfig::from_toml_str("session_ttl_seconds = 3600").unwrap();
    /// assert_eq!(config.session_ttl_seconds, 3600);
    /// assert_eq!(config.cookie_name, "belfast_session");
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| AuthError::Config(e.to_string()))?;
        Ok(config.normalize())
    }

    /// Replace non-positive or empty values with defaults and clean up origins.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.session_ttl_seconds <= 0 {
            self.session_ttl_seconds = DEFAULT_SESSION_TTL_SECONDS;
        }
        if self.cookie_name.trim().is_empty() {
            self.cookie_name = DEFAULT_COOKIE_NAME.to_string();
        }
        if self.csrf_token_ttl_seconds <= 0 {
            self.csrf_token_ttl_seconds = DEFAULT_CSRF_TOKEN_TTL_SECONDS;
        }
        if self.password_min_length == 0 {
            self.password_min_length = DEFAULT_PASSWORD_MIN_LENGTH;
        }
        if self.password_max_length == 0 {
            self.password_max_length = DEFAULT_PASSWORD_MAX_LENGTH;
        }
        self.password_hash_params.normalize();
        if self.webauthn_challenge_ttl_seconds <= 0 {
            self.webauthn_challenge_ttl_seconds = DEFAULT_CHALLENGE_TTL_SECONDS;
        }
        self.webauthn_expected_origins = self
            .webauthn_expected_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect();
        if self.rate_limit_window_seconds <= 0 {
            self.rate_limit_window_seconds = DEFAULT_RATE_LIMIT_WINDOW_SECONDS;
        }
        if self.rate_limit_login_max == 0 {
            self.rate_limit_login_max = DEFAULT_RATE_LIMIT_LOGIN_MAX;
        }
        if self.rate_limit_passkey_max == 0 {
            self.rate_limit_passkey_max = DEFAULT_RATE_LIMIT_PASSKEY_MAX;
        }
        self
    }

    /// Whether enough relying party settings exist to run ceremonies.
    #[must_use]
    pub fn is_webauthn_configured(&self) -> bool {
        !self.webauthn_rp_id.trim().is_empty()
            && !self.webauthn_rp_name.trim().is_empty()
            && !self.webauthn_expected_origins.is_empty()
    }

    /// Set relying party settings.
    #[must_use]
    pub fn with_webauthn(
        mut self,
        rp_id: impl Into<String>,
        rp_name: impl Into<String>,
        origins: Vec<String>,
    ) -> Self {
        self.webauthn_rp_id = rp_id.into();
        self.webauthn_rp_name = rp_name.into();
        self.webauthn_expected_origins = origins;
        self
    }

    /// Set session lifetime.
    #[must_use]
    pub const fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Enable or disable sliding sessions.
    #[must_use]
    pub const fn with_session_sliding(mut self, sliding: bool) -> Self {
        self.session_sliding = sliding;
        self
    }

    /// Set CSRF token lifetime.
    #[must_use]
    pub const fn with_csrf_ttl_seconds(mut self, seconds: i64) -> Self {
        self.csrf_token_ttl_seconds = seconds;
        self
    }

    /// Set challenge lifetime.
    #[must_use]
    pub const fn with_challenge_ttl_seconds(mut self, seconds: i64) -> Self {
        self.webauthn_challenge_ttl_seconds = seconds;
        self
    }

    /// Set accepted password lengths.
    #[must_use]
    pub const fn with_password_length(mut self, min: usize, max: usize) -> Self {
        self.password_min_length = min;
        self.password_max_length = max;
        self
    }

    /// Set Argon2id cost parameters.
    #[must_use]
    pub const fn with_hash_params(mut self, params: Argon2Params) -> Self {
        self.password_hash_params = params;
        self
    }

    /// Set rate limiting window and budgets.
    #[must_use]
    pub const fn with_rate_limits(mut self, window_seconds: i64, login_max: u32, passkey_max: u32) -> Self {
        self.rate_limit_window_seconds = window_seconds;
        self.rate_limit_login_max = login_max;
        self.rate_limit_passkey_max = passkey_max;
        self
    }

    /// Set cookie attributes.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, secure: bool, same_site: SameSite) -> Self {
        self.cookie_name = name.into();
        self.cookie_secure = secure;
        self.cookie_same_site = same_site;
        self
    }

    /// Session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        seconds_or(self.session_ttl_seconds, DEFAULT_SESSION_TTL_SECONDS)
    }

    /// CSRF token lifetime.
    #[must_use]
    pub fn csrf_ttl(&self) -> Duration {
        seconds_or(self.csrf_token_ttl_seconds, DEFAULT_CSRF_TOKEN_TTL_SECONDS)
    }

    /// Pending challenge lifetime.
    #[must_use]
    pub fn challenge_ttl(&self) -> Duration {
        seconds_or(self.webauthn_challenge_ttl_seconds, DEFAULT_CHALLENGE_TTL_SECONDS)
    }

    /// Rate limiting window.
    #[must_use]
    pub fn rate_limit_window(&self) -> std::time::Duration {
        let seconds = u64::try_from(self.rate_limit_window_seconds)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECONDS.unsigned_abs());
        std::time::Duration::from_secs(seconds)
    }
}

fn seconds_or(value: i64, fallback: i64) -> Duration {
    let value = if value > 0 { value } else { fallback };
    Duration::try_seconds(value).unwrap_or_else(|| Duration::seconds(fallback))
}
