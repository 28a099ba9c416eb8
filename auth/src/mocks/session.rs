//! Mock session store for testing.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{AccountId, Session, SessionId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock session store.
///
/// Uses in-memory storage for testing.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
    }
}

impl SessionStore for MockSessionStore {
    async fn create(&self, session: &Session) -> Result<()> {
        let mut sessions = self.lock()?;
        if sessions.contains_key(&session.id) {
            return Err(AuthError::InternalError("Session ID already exists".to_string()));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<Session>> {
        Ok(self.lock()?.get(session_id).cloned())
    }

    async fn update_csrf(
        &self,
        session_id: &SessionId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut sessions = self.lock()?;
        let session = sessions.get_mut(session_id).ok_or(AuthError::SessionNotFound)?;
        session.csrf_token = token.to_string();
        session.csrf_expires_at = expires_at;
        Ok(())
    }

    async fn touch(
        &self,
        session_id: &SessionId,
        last_seen_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut sessions = self.lock()?;
        if let Some(session) = sessions.get_mut(session_id) {
            session.last_seen_at = last_seen_at;
            if let Some(expires_at) = expires_at {
                session.expires_at = expires_at;
            }
        }
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<()> {
        self.lock()?.remove(session_id);
        Ok(())
    }

    async fn delete_for_account(
        &self,
        account_id: AccountId,
        except: Option<&SessionId>,
    ) -> Result<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|id, session| session.account_id != account_id || Some(id) == except);
        Ok(before - sessions.len())
    }
}
