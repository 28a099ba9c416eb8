//! Authentication providers.
//!
//! This module defines traits for all external dependencies used by the
//! identity core. These traits enable dependency injection and make the
//! authentication logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. The coordinators
//! depend on these traits; the application supplies concrete
//! implementations through [`AuthEnvironment`](crate::environment::AuthEnvironment).
//!
//! Durable storage is split into one narrow trait per entity kind so that
//! accounts, credentials, sessions and challenges may live in different
//! engines:
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │ AccountRepository    │   │ CredentialRepository │
//! └──────────────────────┘   └──────────────────────┘
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │ SessionStore         │   │ ChallengeStore       │
//! └──────────────────────┘   └──────────────────────┘
//! ```
//!
//! This enables:
//! - **Testing**: Use mocks (in-memory, deterministic clock)
//! - **Production**: Use a real database behind the same traits

pub mod account;
pub mod audit;
pub mod challenge_store;
pub mod clock;
pub mod credential;
pub mod rate_limiter;
pub mod session;
pub mod webauthn;

// Re-export provider traits
pub use account::AccountRepository;
pub use audit::{AuditEvent, AuditSink};
pub use challenge_store::ChallengeStore;
pub use clock::{Clock, SystemClock};
pub use credential::{CredentialRepository, CredentialUse};
pub use rate_limiter::RateLimiter;
pub use session::SessionStore;
pub use webauthn::{
    AuthenticatorSelection, CeremonyStart, CredentialResponse, DiscoverableResolver,
    DiscoveredLogin, ResidentKeyRequirement, UserVerificationPolicy, VerifiedLogin,
    VerifiedRegistration, WebAuthnProvider,
};
