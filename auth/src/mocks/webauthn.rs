//! Mock `WebAuthn` provider for testing.
//!
//! Simulates ceremonies without crypto. The state carries the challenge and
//! finishing checks that the client data echoes it back, which is enough to
//! drive the coordinator through every path.

use crate::error::{AuthError, Result};
use crate::providers::{
    AuthenticatorSelection, CeremonyStart, CredentialResponse, DiscoverableResolver,
    DiscoveredLogin, VerifiedLogin, VerifiedRegistration, WebAuthnProvider,
};
use crate::state::{Account, PasskeyCredential};
use crate::utils::{b64url_encode, random_token};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mock `WebAuthn` provider.
#[derive(Debug, Clone, Default)]
pub struct MockWebAuthnProvider {
    reject_next: Arc<AtomicBool>,
}

impl MockWebAuthnProvider {
    /// Create a new mock `WebAuthn` provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `finish_*` call fail verification.
    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Build the JSON a browser would post back for `challenge`.
    #[must_use]
    pub fn credential_json(
        credential_id: &str,
        challenge: &str,
        user_handle: Option<&[u8]>,
    ) -> Value {
        let client_data = json!({
            "type": "webauthn.get",
            "challenge": challenge,
            "origin": "https://admin.example.com",
        });
        let mut response = json!({
            "clientDataJSON": b64url_encode(client_data.to_string()),
            "authenticatorData": "AA",
            "signature": "AA",
            "transports": ["internal"],
        });
        if let Some(handle) = user_handle {
            response["userHandle"] = Value::String(b64url_encode(handle));
        }
        json!({
            "id": credential_id,
            "rawId": credential_id,
            "type": "public-key",
            "response": response,
        })
    }

    fn start(options: Value, challenge: String) -> CeremonyStart {
        CeremonyStart {
            options,
            state: json!({ "challenge": challenge }),
            challenge,
        }
    }

    fn verify(&self, state: &Value, response: &CredentialResponse) -> Result<()> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(AuthError::WebAuthnVerificationFailed);
        }
        let expected = state.get("challenge").and_then(Value::as_str);
        if expected != Some(response.challenge()?.as_str()) {
            return Err(AuthError::WebAuthnVerificationFailed);
        }
        Ok(())
    }

    fn descriptors<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<Value> {
        ids.map(|id| json!({ "type": "public-key", "id": id }))
            .collect()
    }
}

impl WebAuthnProvider for MockWebAuthnProvider {
    async fn begin_registration(
        &self,
        account: &Account,
        user_handle: &[u8],
        exclude_credentials: &[String],
        selection: &AuthenticatorSelection,
    ) -> Result<CeremonyStart> {
        let challenge = random_token(32);
        let options = json!({
            "publicKey": {
                "challenge": challenge,
                "user": {
                    "id": b64url_encode(user_handle),
                    "name": account.display_name(),
                    "displayName": account.display_name(),
                },
                "excludeCredentials": Self::descriptors(exclude_credentials.iter().map(String::as_str)),
                "authenticatorSelection": selection,
            }
        });
        Ok(Self::start(options, challenge))
    }

    async fn finish_registration(
        &self,
        state: &Value,
        response: &CredentialResponse,
    ) -> Result<VerifiedRegistration> {
        self.verify(state, response)?;
        // Attested id comes from rawId
        let credential_id = response
            .payload
            .get("rawId")
            .and_then(Value::as_str)
            .unwrap_or(&response.credential_id)
            .to_string();
        Ok(VerifiedRegistration {
            credential_id,
            key_material: json!({ "mock": response.credential_id }),
            sign_count: 0,
            attestation_type: "none".to_string(),
            backup_eligible: Some(false),
            backup_state: Some(false),
        })
    }

    async fn begin_login(&self, credentials: &[PasskeyCredential]) -> Result<CeremonyStart> {
        let challenge = random_token(32);
        let allowed = credentials.iter().map(|c| c.credential_id.as_str());
        let options = json!({
            "publicKey": {
                "challenge": challenge,
                "allowCredentials": Self::descriptors(allowed),
            }
        });
        Ok(Self::start(options, challenge))
    }

    async fn begin_discoverable_login(&self) -> Result<CeremonyStart> {
        let challenge = random_token(32);
        let options = json!({
            "publicKey": { "challenge": challenge, "allowCredentials": [] },
            "mediation": "conditional",
        });
        Ok(Self::start(options, challenge))
    }

    async fn finish_login(
        &self,
        state: &Value,
        response: &CredentialResponse,
        credential: &PasskeyCredential,
    ) -> Result<VerifiedLogin> {
        self.verify(state, response)?;
        if response.credential_id != credential.credential_id {
            return Err(AuthError::WebAuthnVerificationFailed);
        }
        Ok(VerifiedLogin {
            credential_id: credential.credential_id.clone(),
            sign_count: credential.sign_count + 1,
            backup_eligible: false,
            backup_state: false,
            key_material: None,
        })
    }

    async fn finish_discoverable_login<R: DiscoverableResolver>(
        &self,
        state: &Value,
        response: &CredentialResponse,
        resolver: &R,
    ) -> Result<DiscoveredLogin> {
        let user_handle = response
            .user_handle()
            .ok_or(AuthError::WebAuthnVerificationFailed)?;
        let (account, credentials) = resolver.resolve(&user_handle).await?;
        let credential = credentials
            .into_iter()
            .find(|c| c.credential_id == response.credential_id)
            .ok_or(AuthError::WebAuthnVerificationFailed)?;
        let verified = self.finish_login(state, response, &credential).await?;

        Ok(DiscoveredLogin {
            account,
            credential,
            verified,
        })
    }
}
