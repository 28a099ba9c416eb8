//! Capturing audit sink for testing.

use crate::providers::{AuditEvent, AuditSink};
use std::sync::{Arc, Mutex, PoisonError};

/// Audit sink that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MockAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MockAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded action names, oldest first.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.action).collect()
    }
}

impl AuditSink for MockAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
