//! Mock account repository for testing.

use crate::error::{AuthError, Result};
use crate::providers::AccountRepository;
use crate::state::{Account, AccountId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock account repository.
///
/// Uses in-memory storage for testing.
#[derive(Debug, Clone, Default)]
pub struct MockAccountRepository {
    accounts: Arc<Mutex<HashMap<AccountId, Account>>>,
}

impl MockAccountRepository {
    /// Create a new mock account repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account directly (test setup).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn put(&self, account: Account) -> Result<()> {
        self.lock()?.insert(account.id, account);
        Ok(())
    }

    /// Read an account directly (test assertions).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn snapshot(&self, account_id: AccountId) -> Result<Option<Account>> {
        Ok(self.lock()?.get(&account_id).cloned())
    }

    /// Mark an account disabled.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned or the account is unknown.
    pub fn disable(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<()> {
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(&account_id).ok_or(AuthError::UserNotFound)?;
        account.disabled_at = Some(at);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<AccountId, Account>>> {
        self.accounts
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl AccountRepository for MockAccountRepository {
    async fn get_by_id(&self, account_id: AccountId) -> Result<Option<Account>> {
        Ok(self.lock()?.get(&account_id).cloned())
    }

    async fn get_by_username(&self, username_normalized: &str) -> Result<Option<Account>> {
        Ok(self
            .lock()?
            .values()
            .find(|account| account.username_normalized.as_deref() == Some(username_normalized))
            .cloned())
    }

    async fn get_by_user_handle(&self, user_handle: &[u8]) -> Result<Option<Account>> {
        Ok(self
            .lock()?
            .values()
            .find(|account| account.webauthn_user_handle.as_deref() == Some(user_handle))
            .cloned())
    }

    async fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.lock()?;
        let taken = accounts.values().any(|existing| {
            existing.username_normalized.is_some()
                && existing.username_normalized == account.username_normalized
        });
        if taken {
            return Err(AuthError::InvalidRequest("username already exists".into()));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn ensure_user_handle(&self, account_id: AccountId, candidate: Vec<u8>) -> Result<Vec<u8>> {
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(&account_id).ok_or(AuthError::UserNotFound)?;
        Ok(account
            .webauthn_user_handle
            .get_or_insert(candidate)
            .clone())
    }

    async fn update_password(
        &self,
        account_id: AccountId,
        password_hash: &str,
        algorithm: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(&account_id).ok_or(AuthError::UserNotFound)?;
        account.password_hash = password_hash.to_string();
        account.password_algorithm = algorithm.to_string();
        account.updated_at = now;
        Ok(())
    }

    async fn update_last_login(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<()> {
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(&account_id).ok_or(AuthError::UserNotFound)?;
        account.last_login_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str) -> Account {
        Account::new(username, "hash".into(), "argon2id".into(), Utc::now())
    }

    #[tokio::test]
    async fn test_create_enforces_unique_username() {
        let repo = MockAccountRepository::new();
        repo.create(&account("Alice")).await.unwrap();

        let result = repo.create(&account(" alice ")).await;
        assert!(matches!(result, Err(AuthError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_ensure_user_handle_keeps_first_value() {
        let repo = MockAccountRepository::new();
        let alice = account("alice");
        repo.create(&alice).await.unwrap();

        let first = repo.ensure_user_handle(alice.id, vec![1; 16]).await.unwrap();
        let second = repo.ensure_user_handle(alice.id, vec![2; 16]).await.unwrap();

        assert_eq!(first, vec![1; 16]);
        assert_eq!(second, vec![1; 16]);
        assert!(repo.get_by_user_handle(&[1; 16]).await.unwrap().is_some());
    }
}
