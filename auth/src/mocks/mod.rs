//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests.

pub mod account;
pub mod audit;
pub mod challenge_store;
pub mod clock;
pub mod credential;
pub mod session;
pub mod webauthn;

pub use account::MockAccountRepository;
pub use audit::MockAuditSink;
pub use challenge_store::MockChallengeStore;
pub use clock::MockClock;
pub use credential::MockCredentialRepository;
pub use session::MockSessionStore;
pub use webauthn::MockWebAuthnProvider;
