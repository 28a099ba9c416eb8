//! Audit sink trait.

use crate::state::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One security-relevant event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Action name, see [`audit_actions`](crate::constants::audit_actions).
    pub action: String,

    /// Account performing the action, when known.
    pub actor: Option<AccountId>,

    /// Account the action applies to, when known.
    pub target: Option<AccountId>,

    /// Free-form context (username, method, credential id).
    pub metadata: Map<String, Value>,

    /// Event time.
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event with no actor, target or metadata.
    #[must_use]
    pub fn new(action: &str, at: DateTime<Utc>) -> Self {
        Self {
            action: action.to_string(),
            actor: None,
            target: None,
            metadata: Map::new(),
            at,
        }
    }

    /// Set actor and target to the same account.
    #[must_use]
    pub const fn by(mut self, account_id: AccountId) -> Self {
        self.actor = Some(account_id);
        self.target = Some(account_id);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Fire-and-forget audit log.
///
/// Implementations must not block the caller and must swallow their own
/// failures: auditing is never on the success/failure path of an operation.
pub trait AuditSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: AuditEvent);
}
