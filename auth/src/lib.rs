//! # Belfast Identity & Session Core
//!
//! Password login, passkey (WebAuthn) ceremonies, cookie sessions with
//! CSRF tokens, and in-process rate limiting for the Belfast
//! administration panel.
//!
//! ## Features
//!
//! - **Passwords**: Argon2id hashes with transparent re-hash on login
//! - **Passkeys**: named and discoverable login, single-use challenges
//! - **Sessions**: opaque random ids, lazily refreshed CSRF tokens
//! - **Abuse control**: sharded sliding-window rate limiter
//! - **Testable**: every store, the clock and the ceremony provider are injected
//!
//! ## Architecture
//!
//! ```text
//! HTTP glue ──► LoginService ─────────┐
//!          └──► CeremonyCoordinator ──┼──► SessionManager
//!                                     ▼
//!                              AuthEnvironment
//!      (accounts, credentials, sessions, challenges, rate limiter,
//!               WebAuthn provider, audit sink, clock)
//! ```
//!
//! ## Example: Password Login
//!
//! ```rust,ignore
//! use belfast_auth::*;
//!
//! let env = Arc::new(AuthEnvironment::new(
//!     accounts, credentials, sessions, challenges,
//!     InMemoryRateLimiter::new(), WebauthnRsProvider::from_config(&config)?,
//!     TracingAuditSink, SystemClock,
//! ));
//! let login = LoginService::new(Arc::clone(&env), Arc::new(config))?;
//!
//! let outcome = login
//!     .login("alice", "correct-horse", ClientInfo { ip: "10.0.0.1:5123", user_agent: "curl" })
//!     .await?;
//! response.header("Set-Cookie", outcome.cookie.to_header_value());
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Public modules
pub mod ceremony;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod login;
pub mod password;
pub mod providers;
pub mod session;
pub mod state;
pub mod stores;
pub mod utils;

// Mock implementations for testing
#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use ceremony::{CeremonyCoordinator, ClientInfo};
pub use config::AuthConfig;
pub use environment::{AuthContext, AuthEnvironment};
pub use error::{AuthError, Result};
pub use login::LoginService;
pub use password::{HashedPassword, PasswordAuthenticator};
pub use session::{LoginOutcome, SessionCookie, SessionManager};
pub use state::{Account, AccountId, Challenge, ChallengePurpose, PasskeyCredential, Session, SessionId};
pub use stores::{InMemoryRateLimiter, TracingAuditSink, WebauthnRsProvider};
