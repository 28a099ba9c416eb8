//! Mock `WebAuthn` challenge store for testing.

use crate::error::{AuthError, Result};
use crate::providers::ChallengeStore;
use crate::state::{AccountId, Challenge, ChallengeId, ChallengePurpose};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock `WebAuthn` challenge store.
///
/// In-memory implementation for testing. Expiry is left to the caller,
/// like a database row that no sweeper has removed yet.
#[derive(Debug, Clone, Default)]
pub struct MockChallengeStore {
    challenges: Arc<Mutex<HashMap<ChallengeId, Challenge>>>,
}

impl MockChallengeStore {
    /// Create a new mock challenge store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored challenges.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn challenge_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ChallengeId, Challenge>>> {
        self.challenges
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl ChallengeStore for MockChallengeStore {
    async fn put(&self, challenge: &Challenge) -> Result<()> {
        let mut store = self.lock()?;
        if let Some(account_id) = challenge.account_id {
            store.retain(|_, existing| {
                existing.account_id != Some(account_id) || existing.purpose != challenge.purpose
            });
        }
        store.insert(challenge.id, challenge.clone());
        Ok(())
    }

    async fn get_for_account(
        &self,
        account_id: AccountId,
        purpose: ChallengePurpose,
    ) -> Result<Option<Challenge>> {
        Ok(self
            .lock()?
            .values()
            .filter(|c| c.account_id == Some(account_id) && c.purpose == purpose)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn get_by_value(
        &self,
        challenge: &str,
        purpose: ChallengePurpose,
    ) -> Result<Option<Challenge>> {
        Ok(self
            .lock()?
            .values()
            .filter(|c| c.challenge == challenge && c.purpose == purpose)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn consume(&self, challenge_id: ChallengeId) -> Result<bool> {
        // Atomic get-and-remove
        Ok(self.lock()?.remove(&challenge_id).is_some())
    }
}
