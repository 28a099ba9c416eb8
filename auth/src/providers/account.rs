//! Account repository trait.

use crate::error::Result;
use crate::state::{Account, AccountId};
use chrono::{DateTime, Utc};

/// Account repository.
///
/// This trait abstracts over durable account storage. Lookups return
/// `Ok(None)` for missing rows; errors are reserved for storage failures.
///
/// # Implementation Notes
///
/// - `username_normalized` must be unique
/// - `webauthn_user_handle` must be unique and never change once set
pub trait AccountRepository: Send + Sync {
    /// Get account by id.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn get_by_id(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Get account by normalized username.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn get_by_username(
        &self,
        username_normalized: &str,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Get account by WebAuthn user handle.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn get_by_user_handle(
        &self,
        user_handle: &[u8],
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage write fails
    /// - Normalized username already exists → `AuthError::InvalidRequest`
    fn create(
        &self,
        account: &Account,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Persist `candidate` as the user handle unless one is already set.
    ///
    /// # Returns
    ///
    /// The handle now stored on the account (the existing one wins).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage write fails
    /// - Account does not exist → `AuthError::UserNotFound`
    fn ensure_user_handle(
        &self,
        account_id: AccountId,
        candidate: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    /// Replace the password hash and algorithm tag.
    ///
    /// # Errors
    ///
    /// Returns error if the storage write fails.
    fn update_password(
        &self,
        account_id: AccountId,
        password_hash: &str,
        algorithm: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns error if the storage write fails.
    fn update_last_login(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
