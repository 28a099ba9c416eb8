//! Passkey credential repository trait.

use crate::error::Result;
use crate::state::{AccountId, PasskeyCredential};
use chrono::{DateTime, Utc};

/// Counter, flags and key material observed at a successful authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialUse {
    /// Signature counter reported by the authenticator.
    pub sign_count: u32,

    /// Backup eligibility flag.
    pub backup_eligible: bool,

    /// Backup state flag.
    pub backup_state: bool,

    /// Replacement key material, when the provider changed it.
    pub key_material: Option<serde_json::Value>,

    /// Time of use.
    pub used_at: DateTime<Utc>,
}

/// Passkey credential repository.
///
/// Credential ids are globally unique: an authenticator cannot be shared
/// across accounts.
pub trait CredentialRepository: Send + Sync {
    /// List credentials owned by an account.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Vec<PasskeyCredential>>> + Send;

    /// Get a credential by id, regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn get(
        &self,
        credential_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<PasskeyCredential>>> + Send;

    /// Insert a newly registered credential.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage write fails
    /// - Credential id already exists → `AuthError::CredentialExists`
    fn insert(
        &self,
        credential: &PasskeyCredential,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Apply the outcome of a successful authentication.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage write fails
    /// - Credential does not exist → `AuthError::PasskeyNotFound`
    fn record_use(
        &self,
        credential_id: &str,
        usage: CredentialUse,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete a credential owned by `account_id`.
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the storage write fails.
    fn delete(
        &self,
        account_id: AccountId,
        credential_id: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
