//! Audit sink backed by `tracing`.

use crate::providers::{AuditEvent, AuditSink};

/// Writes audit events as structured `tracing` events under target `audit`.
///
/// Route the `audit` target to durable storage with a subscriber layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let metadata = serde_json::Value::Object(event.metadata);
        let actor = event.actor.map(|id| id.to_string()).unwrap_or_default();
        let target = event.target.map(|id| id.to_string()).unwrap_or_default();
        tracing::info!(
            target: "audit",
            action = %event.action,
            actor = %actor,
            target_account = %target,
            metadata = %metadata,
            at = %event.at.to_rfc3339(),
            "audit event"
        );
    }
}
