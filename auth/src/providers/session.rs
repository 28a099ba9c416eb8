//! Session store trait.

use crate::error::Result;
use crate::state::{AccountId, Session, SessionId};
use chrono::{DateTime, Utc};

/// Session store.
///
/// This trait abstracts over session persistence. Sessions may be shared
/// across process instances, so callers always re-validate expiry from the
/// returned timestamps.
pub trait SessionStore: Send + Sync {
    /// Create session.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage write fails
    /// - Session ID already exists
    fn create(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Get session.
    ///
    /// # Returns
    ///
    /// The stored session, expired or not, or `None` if absent or revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the storage query fails.
    fn get(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Option<Session>>> + Send;

    /// Replace the CSRF token.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Storage write fails
    /// - Session not found → `AuthError::SessionNotFound`
    fn update_csrf(
        &self,
        session_id: &SessionId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Update `last_seen_at` and optionally extend expiry.
    ///
    /// # Errors
    ///
    /// Returns error if the storage write fails.
    fn touch(
        &self,
        session_id: &SessionId,
        last_seen_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete session.
    ///
    /// # Errors
    ///
    /// Returns error if the storage write fails.
    fn delete(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete all sessions of an account except `except`.
    ///
    /// # Returns
    ///
    /// Number of sessions deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the storage write fails.
    fn delete_for_account(
        &self,
        account_id: AccountId,
        except: Option<&SessionId>,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
}
