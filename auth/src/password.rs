//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings, so each stored hash carries its own
//! salt and cost parameters. Verification reads the parameters from the
//! stored hash; only new hashes use the configured ones, and
//! [`PasswordAuthenticator::needs_rehash`] reports when a stored hash lags
//! behind the configuration.

use crate::config::{Argon2Params, AuthConfig};
use crate::constants::PASSWORD_ALGORITHM_ARGON2ID;
use crate::error::{AuthError, Result};
use crate::utils::random_bytes;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use std::sync::Arc;

/// Output of [`PasswordAuthenticator::hash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    /// PHC string.
    pub hash: String,

    /// Algorithm tag stored next to the hash.
    pub algorithm: String,
}

/// Hashes and verifies account passwords.
///
/// Cheap to clone; clones share the dummy hash.
#[derive(Debug, Clone)]
pub struct PasswordAuthenticator {
    params: Argon2Params,
    min_length: usize,
    max_length: usize,
    dummy: Arc<str>,
}

impl PasswordAuthenticator {
    /// Create an authenticator from the password settings in `config`.
    ///
    /// Hashes a throwaway password up front so that the first unknown-user
    /// login costs the same as every other one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if Argon2 rejects the configured parameters.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let mut authenticator = Self {
            params: config.password_hash_params,
            min_length: config.password_min_length,
            max_length: config.password_max_length,
            dummy: Arc::from(""),
        };
        authenticator.dummy = Arc::from(
            authenticator.hash_unchecked(&crate::utils::random_token(16))?,
        );
        Ok(authenticator)
    }

    /// Check the length bounds (in characters).
    ///
    /// # Errors
    ///
    /// Returns `PasswordTooShort` or `PasswordTooLong`.
    pub fn validate(&self, password: &str) -> Result<()> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(AuthError::PasswordTooShort);
        }
        if length > self.max_length {
            return Err(AuthError::PasswordTooLong);
        }
        Ok(())
    }

    /// Hash a new password with the configured parameters.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The password is outside the length bounds
    /// - The configured parameters are rejected by Argon2 → `AuthError::Config`
    pub fn hash(&self, password: &str) -> Result<HashedPassword> {
        self.validate(password)?;
        Ok(HashedPassword {
            hash: self.hash_unchecked(password)?,
            algorithm: PASSWORD_ALGORITHM_ARGON2ID.to_string(),
        })
    }

    /// Verify `password` against a stored hash.
    ///
    /// Unknown algorithm tags and unparseable hashes verify as `false`.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str, algorithm: &str) -> bool {
        if algorithm != PASSWORD_ALGORITHM_ARGON2ID {
            tracing::warn!(algorithm, "Unsupported password algorithm");
            return false;
        }
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is not a PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend the same work as a real verification and discard the result.
    ///
    /// Called when the account does not exist so that an unknown username
    /// and a wrong password take the same path.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy, PASSWORD_ALGORITHM_ARGON2ID);
    }

    /// Whether a stored hash should be replaced on the next successful login.
    #[must_use]
    pub fn needs_rehash(&self, hash: &str, algorithm: &str) -> bool {
        if algorithm != PASSWORD_ALGORITHM_ARGON2ID {
            return true;
        }
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return true;
        }
        let Ok(stored) = Params::try_from(&parsed) else {
            return true;
        };
        let key_length = parsed.hash.map(|output| output.len());
        let salt_length = parsed.salt.map(|salt| {
            let mut buf = [0u8; argon2::password_hash::Salt::MAX_LENGTH];
            salt.decode_b64(&mut buf).map_or(0, <[u8]>::len)
        });

        stored.m_cost() != self.params.memory
            || stored.t_cost() != self.params.iterations
            || stored.p_cost() != self.params.parallelism
            || key_length != usize::try_from(self.params.key_length).ok()
            || salt_length != usize::try_from(self.params.salt_length).ok()
    }

    fn hash_unchecked(&self, password: &str) -> Result<String> {
        let hasher = self.hasher()?;
        let salt_length = usize::try_from(self.params.salt_length)
            .map_err(|e| AuthError::Config(format!("Invalid salt length: {e}")))?;
        let salt = SaltString::encode_b64(&random_bytes(salt_length))
            .map_err(|e| AuthError::Config(format!("Invalid salt length: {e}")))?;

        hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {e}")))
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let key_length = usize::try_from(self.params.key_length)
            .map_err(|e| AuthError::Config(format!("Invalid key length: {e}")))?;
        let params = Params::new(
            self.params.memory,
            self.params.iterations,
            self.params.parallelism,
            Some(key_length),
        )
        .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Params {
        Argon2Params {
            memory: 256,
            iterations: 1,
            parallelism: 1,
            salt_length: 16,
            key_length: 32,
        }
    }

    fn authenticator() -> PasswordAuthenticator {
        PasswordAuthenticator::new(&AuthConfig::default().with_hash_params(cheap())).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let passwords = authenticator();
        let hashed = passwords.hash("correct-horse-battery").unwrap();

        assert_eq!(hashed.algorithm, "argon2id");
        assert!(hashed.hash.starts_with("$argon2id$v=19$m=256,t=1,p=1$"));
        assert!(passwords.verify("correct-horse-battery", &hashed.hash, &hashed.algorithm));
        assert!(!passwords.verify("wrong-horse-battery", &hashed.hash, &hashed.algorithm));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let passwords = authenticator();
        let a = passwords.hash("correct-horse-battery").unwrap();
        let b = passwords.hash("correct-horse-battery").unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_length_bounds() {
        let passwords = PasswordAuthenticator::new(
            &AuthConfig::default()
                .with_hash_params(cheap())
                .with_password_length(12, 16),
        )
        .unwrap();

        assert_eq!(passwords.hash("short"), Err(AuthError::PasswordTooShort));
        assert_eq!(
            passwords.hash("this-one-is-far-too-long"),
            Err(AuthError::PasswordTooLong)
        );
        // Bounds count characters, not bytes
        assert!(passwords.validate("ééééééééééééé").is_ok());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let passwords = authenticator();
        assert!(!passwords.verify("anything", "not-a-phc-string", "argon2id"));
        assert!(!passwords.verify("anything", "$2b$10$abc", "bcrypt"));
    }

    #[test]
    fn test_dummy_hash_is_ready_before_first_use() {
        let passwords = authenticator();
        assert!(passwords.dummy.starts_with("$argon2id$v=19$m=256,t=1,p=1$"));
        assert!(!passwords.needs_rehash(&passwords.dummy, "argon2id"));

        let dummy = Arc::clone(&passwords.dummy);
        passwords.verify_dummy("whatever");
        assert!(Arc::ptr_eq(&dummy, &passwords.dummy));
    }

    #[test]
    fn test_new_rejects_unusable_parameters() {
        let config = AuthConfig::default().with_hash_params(Argon2Params {
            memory: 1,
            ..cheap()
        });
        assert!(matches!(
            PasswordAuthenticator::new(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_needs_rehash_tracks_configuration() {
        let passwords = authenticator();
        let hashed = passwords.hash("correct-horse-battery").unwrap();
        assert!(!passwords.needs_rehash(&hashed.hash, &hashed.algorithm));

        let stronger = PasswordAuthenticator::new(
            &AuthConfig::default().with_hash_params(Argon2Params {
                iterations: 2,
                ..cheap()
            }),
        )
        .unwrap();
        assert!(stronger.needs_rehash(&hashed.hash, &hashed.algorithm));
        assert!(passwords.needs_rehash(&hashed.hash, "bcrypt"));
    }
}
