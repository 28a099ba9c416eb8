//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use belfast_auth::config::{Argon2Params, AuthConfig};
use belfast_auth::mocks::{
    MockAccountRepository, MockAuditSink, MockChallengeStore, MockClock, MockCredentialRepository,
    MockSessionStore, MockWebAuthnProvider,
};
use belfast_auth::providers::{AccountRepository, Clock};
use belfast_auth::stores::InMemoryRateLimiter;
use belfast_auth::{
    Account, AuthEnvironment, CeremonyCoordinator, ClientInfo, LoginService,
    PasswordAuthenticator,
};
use std::sync::Arc;

pub type TestEnv = AuthEnvironment<
    MockAccountRepository,
    MockCredentialRepository,
    MockSessionStore,
    MockChallengeStore,
    InMemoryRateLimiter<MockClock>,
    MockWebAuthnProvider,
    MockAuditSink,
    MockClock,
>;

pub const CLIENT: ClientInfo<'static> = ClientInfo {
    ip: "203.0.113.7:51234",
    user_agent: "integration-test",
};

/// Handles onto every mock plus the services under test.
pub struct Harness {
    pub config: Arc<AuthConfig>,
    pub clock: MockClock,
    pub accounts: MockAccountRepository,
    pub credentials: MockCredentialRepository,
    pub sessions: MockSessionStore,
    pub challenges: MockChallengeStore,
    pub webauthn: MockWebAuthnProvider,
    pub audit: MockAuditSink,
    pub env: Arc<TestEnv>,
    pub login: LoginService<TestEnv>,
    pub ceremonies: CeremonyCoordinator<TestEnv>,
}

pub fn config() -> AuthConfig {
    AuthConfig::default()
        .with_hash_params(Argon2Params {
            memory: 256,
            iterations: 1,
            parallelism: 1,
            salt_length: 16,
            key_length: 32,
        })
        .with_webauthn(
            "admin.example.com",
            "Belfast",
            vec!["https://admin.example.com".to_string()],
        )
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let config = Arc::new(config);
        let clock = MockClock::new();
        let accounts = MockAccountRepository::new();
        let credentials = MockCredentialRepository::new();
        let sessions = MockSessionStore::new();
        let challenges = MockChallengeStore::new();
        let webauthn = MockWebAuthnProvider::new();
        let audit = MockAuditSink::new();

        let env = Arc::new(AuthEnvironment::new(
            accounts.clone(),
            credentials.clone(),
            sessions.clone(),
            challenges.clone(),
            InMemoryRateLimiter::with_clock(clock.clone()),
            webauthn.clone(),
            audit.clone(),
            clock.clone(),
        ));
        let login = LoginService::new(Arc::clone(&env), Arc::clone(&config)).unwrap();
        let ceremonies = CeremonyCoordinator::new(Arc::clone(&env), Arc::clone(&config));

        Self {
            config,
            clock,
            accounts,
            credentials,
            sessions,
            challenges,
            webauthn,
            audit,
            env,
            login,
            ceremonies,
        }
    }

    /// Persist an active account with `password`.
    pub async fn create_account(&self, username: &str, password: &str) -> Account {
        let hashed = PasswordAuthenticator::new(&self.config).unwrap().hash(password).unwrap();
        let account = Account::new(username, hashed.hash, hashed.algorithm, self.clock.now());
        self.accounts.create(&account).await.unwrap();
        account
    }
}
