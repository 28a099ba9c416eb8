//! Authentication environment.
//!
//! This module defines the environment type for dependency injection
//! into the coordinators. Nothing in the crate reaches for a global: every
//! store, the ceremony provider, the rate limiter, the audit sink and the
//! clock arrive through an [`AuthEnvironment`].

use crate::providers::{
    AccountRepository, AuditSink, ChallengeStore, Clock, CredentialRepository, RateLimiter,
    SessionStore, WebAuthnProvider,
};

/// Provider bundle seen by the coordinators.
///
/// Implemented by [`AuthEnvironment`]; the associated types keep the
/// coordinators generic over one parameter instead of eight.
pub trait AuthContext: Send + Sync + 'static {
    /// Account repository.
    type Accounts: AccountRepository;
    /// Credential repository.
    type Credentials: CredentialRepository;
    /// Session store.
    type Sessions: SessionStore;
    /// Challenge store.
    type Challenges: ChallengeStore;
    /// Rate limiter.
    type Limiter: RateLimiter;
    /// Ceremony provider.
    type WebAuthn: WebAuthnProvider;
    /// Audit sink.
    type Audit: AuditSink;
    /// Time source.
    type Clock: Clock;

    /// Account repository.
    fn accounts(&self) -> &Self::Accounts;
    /// Credential repository.
    fn credentials(&self) -> &Self::Credentials;
    /// Session store.
    fn sessions(&self) -> &Self::Sessions;
    /// Challenge store.
    fn challenges(&self) -> &Self::Challenges;
    /// Rate limiter.
    fn rate_limiter(&self) -> &Self::Limiter;
    /// Ceremony provider.
    fn webauthn(&self) -> &Self::WebAuthn;
    /// Audit sink.
    fn audit(&self) -> &Self::Audit;
    /// Time source.
    fn clock(&self) -> &Self::Clock;
}

/// Authentication environment.
///
/// Contains all external dependencies needed by the coordinators.
///
/// # Type Parameters
///
/// - `A`: Account repository
/// - `C`: Credential repository
/// - `S`: Session store
/// - `Ch`: Challenge store
/// - `RL`: Rate limiter
/// - `W`: `WebAuthn` provider
/// - `Au`: Audit sink
/// - `K`: Clock
#[derive(Debug, Clone)]
pub struct AuthEnvironment<A, C, S, Ch, RL, W, Au, K> {
    /// Account repository.
    pub accounts: A,

    /// Passkey credential repository.
    pub credentials: C,

    /// Session store.
    pub sessions: S,

    /// Challenge store (single-use consumption).
    pub challenges: Ch,

    /// Rate limiter (brute force protection).
    pub rate_limiter: RL,

    /// `WebAuthn` ceremony provider.
    pub webauthn: W,

    /// Audit sink.
    pub audit: Au,

    /// Time source.
    pub clock: K,
}

impl<A, C, S, Ch, RL, W, Au, K> AuthEnvironment<A, C, S, Ch, RL, W, Au, K>
where
    A: AccountRepository,
    C: CredentialRepository,
    S: SessionStore,
    Ch: ChallengeStore,
    RL: RateLimiter,
    W: WebAuthnProvider,
    Au: AuditSink,
    K: Clock,
{
    /// Create a new authentication environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        accounts: A,
        credentials: C,
        sessions: S,
        challenges: Ch,
        rate_limiter: RL,
        webauthn: W,
        audit: Au,
        clock: K,
    ) -> Self {
        Self {
            accounts,
            credentials,
            sessions,
            challenges,
            rate_limiter,
            webauthn,
            audit,
            clock,
        }
    }
}

impl<A, C, S, Ch, RL, W, Au, K> AuthContext for AuthEnvironment<A, C, S, Ch, RL, W, Au, K>
where
    A: AccountRepository + 'static,
    C: CredentialRepository + 'static,
    S: SessionStore + 'static,
    Ch: ChallengeStore + 'static,
    RL: RateLimiter + 'static,
    W: WebAuthnProvider + 'static,
    Au: AuditSink + 'static,
    K: Clock + 'static,
{
    type Accounts = A;
    type Credentials = C;
    type Sessions = S;
    type Challenges = Ch;
    type Limiter = RL;
    type WebAuthn = W;
    type Audit = Au;
    type Clock = K;

    fn accounts(&self) -> &A {
        &self.accounts
    }

    fn credentials(&self) -> &C {
        &self.credentials
    }

    fn sessions(&self) -> &S {
        &self.sessions
    }

    fn challenges(&self) -> &Ch {
        &self.challenges
    }

    fn rate_limiter(&self) -> &RL {
        &self.rate_limiter
    }

    fn webauthn(&self) -> &W {
        &self.webauthn
    }

    fn audit(&self) -> &Au {
        &self.audit
    }

    fn clock(&self) -> &K {
        &self.clock
    }
}
