//! Provider implementations owned by the identity core.
//!
//! - **Rate Limiter** (in-process) - Sharded sliding window counters
//! - **WebAuthn** (`webauthn-rs`) - Passkey ceremony capability
//! - **Audit** (`tracing`) - Structured audit events
//!
//! Durable storage (accounts, credentials, sessions, challenges) is supplied
//! by the application through the provider traits.

pub mod audit;
pub mod rate_limiter;
pub mod webauthn_rs;

// Re-exports
pub use audit::TracingAuditSink;
pub use rate_limiter::InMemoryRateLimiter;
pub use webauthn_rs::WebauthnRsProvider;
