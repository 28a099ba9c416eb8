//! Mock passkey credential repository for testing.

use crate::error::{AuthError, Result};
use crate::providers::{CredentialRepository, CredentialUse};
use crate::state::{AccountId, PasskeyCredential};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock credential repository.
///
/// Keyed by credential id, which enforces global uniqueness.
#[derive(Debug, Clone, Default)]
pub struct MockCredentialRepository {
    credentials: Arc<Mutex<HashMap<String, PasskeyCredential>>>,
}

impl MockCredentialRepository {
    /// Create a new mock credential repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn credential_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, PasskeyCredential>>> {
        self.credentials
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl CredentialRepository for MockCredentialRepository {
    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<PasskeyCredential>> {
        let mut credentials: Vec<_> = self
            .lock()?
            .values()
            .filter(|credential| credential.account_id == account_id)
            .cloned()
            .collect();
        credentials.sort_by_key(|credential| credential.created_at);
        Ok(credentials)
    }

    async fn get(&self, credential_id: &str) -> Result<Option<PasskeyCredential>> {
        Ok(self.lock()?.get(credential_id).cloned())
    }

    async fn insert(&self, credential: &PasskeyCredential) -> Result<()> {
        let mut credentials = self.lock()?;
        if credentials.contains_key(&credential.credential_id) {
            return Err(AuthError::CredentialExists);
        }
        credentials.insert(credential.credential_id.clone(), credential.clone());
        Ok(())
    }

    async fn record_use(&self, credential_id: &str, usage: CredentialUse) -> Result<()> {
        let mut credentials = self.lock()?;
        let credential = credentials
            .get_mut(credential_id)
            .ok_or(AuthError::PasskeyNotFound)?;
        credential.sign_count = usage.sign_count;
        credential.backup_eligible = Some(usage.backup_eligible);
        credential.backup_state = Some(usage.backup_state);
        credential.last_used_at = Some(usage.used_at);
        if let Some(key_material) = usage.key_material {
            credential.key_material = key_material;
        }
        Ok(())
    }

    async fn delete(&self, account_id: AccountId, credential_id: &str) -> Result<bool> {
        let mut credentials = self.lock()?;
        let owned = credentials
            .get(credential_id)
            .is_some_and(|credential| credential.account_id == account_id);
        if owned {
            credentials.remove(credential_id);
        }
        Ok(owned)
    }
}
