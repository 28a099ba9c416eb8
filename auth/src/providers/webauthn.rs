//! WebAuthn/Passkey ceremony provider trait.
//!
//! The provider owns the protocol and cryptography: it produces the options
//! relayed to the browser and verifies what the authenticator sends back.
//! Everything around it (challenge persistence, expiry, anti-replay checks,
//! credential bookkeeping) lives in [`CeremonyCoordinator`](crate::ceremony::CeremonyCoordinator).

use crate::error::{AuthError, Result};
use crate::state::{Account, PasskeyCredential};
use crate::utils::{b64url_decode, client_data_challenge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
pub use webauthn_rs_proto::{ResidentKeyRequirement, UserVerificationPolicy};

/// Output of a `begin_*` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CeremonyStart {
    /// Options relayed to `navigator.credentials.create/get`.
    pub options: Value,

    /// Opaque state persisted in the pending challenge.
    pub state: Value,

    /// Literal base64url challenge embedded in `options`.
    pub challenge: String,
}

/// A `PublicKeyCredential` as posted by the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialResponse {
    /// Credential id (base64url).
    pub credential_id: String,

    /// Signed client data (base64url).
    pub client_data_json: String,

    /// The full credential JSON.
    pub payload: Value,
}

impl CredentialResponse {
    /// Parse the browser's credential JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] if `id` or
    /// `response.clientDataJSON` is missing.
    pub fn from_json(payload: Value) -> Result<Self> {
        let credential_id = payload
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest("credential id missing".into()))?
            .to_string();
        let client_data_json = payload
            .pointer("/response/clientDataJSON")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::InvalidRequest("clientDataJSON missing".into()))?
            .to_string();

        Ok(Self {
            credential_id,
            client_data_json,
            payload,
        })
    }

    /// Challenge embedded in the signed client data.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] if the client data is malformed.
    pub fn challenge(&self) -> Result<String> {
        client_data_challenge(&self.client_data_json)
    }

    /// User handle reported by the authenticator, if any.
    #[must_use]
    pub fn user_handle(&self) -> Option<Vec<u8>> {
        self.payload
            .pointer("/response/userHandle")
            .and_then(Value::as_str)
            .filter(|handle| !handle.is_empty())
            .and_then(|handle| b64url_decode(handle).ok())
    }

    /// Transports advertised at registration.
    #[must_use]
    pub fn transports(&self) -> Vec<String> {
        self.payload
            .pointer("/response/transports")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Caller preferences laid over the configured authenticator selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    /// Discoverable credential requirement.
    pub resident_key: Option<ResidentKeyRequirement>,

    /// User verification preference. Providers may only honour policies
    /// their finish step enforces; `WebauthnRsProvider` always requires it.
    pub user_verification: Option<UserVerificationPolicy>,
}

/// Verified registration ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedRegistration {
    /// Credential id (base64url).
    pub credential_id: String,

    /// Serialized public key material.
    pub key_material: Value,

    /// Initial signature counter.
    pub sign_count: u32,

    /// Attestation format.
    pub attestation_type: String,

    /// Backup eligibility, if the provider reports it.
    pub backup_eligible: Option<bool>,

    /// Backup state, if the provider reports it.
    pub backup_state: Option<bool>,
}

/// Verified assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedLogin {
    /// Credential that signed the assertion.
    pub credential_id: String,

    /// Counter reported by the authenticator.
    pub sign_count: u32,

    /// Backup eligibility flag.
    pub backup_eligible: bool,

    /// Backup state flag.
    pub backup_state: bool,

    /// Updated key material, when it changed.
    pub key_material: Option<Value>,
}

/// Verified discoverable assertion with the account it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredLogin {
    /// Account owning the credential.
    pub account: Account,

    /// Credential that signed.
    pub credential: PasskeyCredential,

    /// Assertion outcome.
    pub verified: VerifiedLogin,
}

/// Resolves a user handle to an account during discoverable login.
pub trait DiscoverableResolver: Send + Sync {
    /// Load the account and its credentials for `user_handle`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No account has this handle → `AuthError::WebAuthnVerificationFailed`
    /// - The account is disabled → `AuthError::UserDisabled`
    /// - Storage fails
    fn resolve(
        &self,
        user_handle: &[u8],
    ) -> impl std::future::Future<Output = Result<(Account, Vec<PasskeyCredential>)>> + Send;
}

/// WebAuthn provider.
///
/// This trait abstracts over WebAuthn/FIDO2 operations.
///
/// # Implementation Notes
///
/// - [`WebauthnRsProvider`](crate::stores::WebauthnRsProvider) uses `webauthn-rs`
/// - Verification failures map to `AuthError::WebAuthnVerificationFailed`
pub trait WebAuthnProvider: Send + Sync {
    /// Start a registration ceremony.
    ///
    /// # Errors
    ///
    /// Returns error if option generation fails.
    fn begin_registration(
        &self,
        account: &Account,
        user_handle: &[u8],
        exclude_credentials: &[String],
        selection: &AuthenticatorSelection,
    ) -> impl std::future::Future<Output = Result<CeremonyStart>> + Send;

    /// Verify an attestation against the stored state.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WebAuthnVerificationFailed` if verification fails.
    fn finish_registration(
        &self,
        state: &Value,
        response: &CredentialResponse,
    ) -> impl std::future::Future<Output = Result<VerifiedRegistration>> + Send;

    /// Start an authentication ceremony scoped to `credentials`.
    ///
    /// # Errors
    ///
    /// Returns error if option generation fails.
    fn begin_login(
        &self,
        credentials: &[PasskeyCredential],
    ) -> impl std::future::Future<Output = Result<CeremonyStart>> + Send;

    /// Start an authentication ceremony with no credential scoping.
    ///
    /// # Errors
    ///
    /// Returns error if option generation fails.
    fn begin_discoverable_login(
        &self,
    ) -> impl std::future::Future<Output = Result<CeremonyStart>> + Send;

    /// Verify an assertion made with `credential`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WebAuthnVerificationFailed` if verification fails.
    fn finish_login(
        &self,
        state: &Value,
        response: &CredentialResponse,
        credential: &PasskeyCredential,
    ) -> impl std::future::Future<Output = Result<VerifiedLogin>> + Send;

    /// Verify a discoverable assertion, resolving the account through the
    /// authenticator-reported user handle.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WebAuthnVerificationFailed` if verification fails,
    /// or whatever the resolver returns.
    fn finish_discoverable_login<R: DiscoverableResolver>(
        &self,
        state: &Value,
        response: &CredentialResponse,
        resolver: &R,
    ) -> impl std::future::Future<Output = Result<DiscoveredLogin>> + Send;
}
