//! `WebAuthn` challenge storage trait.
//!
//! Stores pending ceremonies between their begin and finish requests. The
//! two requests may land on different process instances, so all ceremony
//! state lives here rather than in memory.
//!
//! # Security
//!
//! Challenges must be:
//! - **Single-use**: [`ChallengeStore::consume`] removes atomically
//! - **Ephemeral**: callers compare `expires_at` against their clock
//! - **Unique per (account, purpose)**: a new one replaces the old one
//!
//! # Example
//!
//! ```ignore
//! let pending = store.get_for_account(account_id, ChallengePurpose::Register).await?
//!     .ok_or(AuthError::ChallengeExpired)?;
//!
//! if !store.consume(pending.id).await? {
//!     // A concurrent finish already used it
//!     return Err(AuthError::ChallengeExpired);
//! }
//! ```

use crate::error::Result;
use crate::state::{AccountId, Challenge, ChallengeId, ChallengePurpose};

/// `WebAuthn` challenge store.
pub trait ChallengeStore: Send + Sync {
    /// Store a challenge.
    ///
    /// When `challenge.account_id` is set, any existing challenge for the
    /// same (account, purpose) pair is replaced.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    fn put(
        &self,
        challenge: &Challenge,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Latest challenge for (account, purpose).
    ///
    /// # Errors
    ///
    /// Returns error only on storage failures, not on missing challenges.
    fn get_for_account(
        &self,
        account_id: AccountId,
        purpose: ChallengePurpose,
    ) -> impl std::future::Future<Output = Result<Option<Challenge>>> + Send;

    /// Challenge by its literal value, for discoverable login.
    ///
    /// # Errors
    ///
    /// Returns error only on storage failures, not on missing challenges.
    fn get_by_value(
        &self,
        challenge: &str,
        purpose: ChallengePurpose,
    ) -> impl std::future::Future<Output = Result<Option<Challenge>>> + Send;

    /// Remove a challenge atomically.
    ///
    /// # Returns
    ///
    /// `true` if this call removed it. Concurrent calls for the same id see
    /// exactly one `true`.
    ///
    /// # Errors
    ///
    /// Returns error if deletion fails (not found is OK).
    fn consume(
        &self,
        challenge_id: ChallengeId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
