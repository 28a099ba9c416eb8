//! `webauthn-rs` backed ceremony provider.
//!
//! Ceremony state (`PasskeyRegistration`, `PasskeyAuthentication`,
//! `DiscoverableAuthentication`) is serialized into the pending challenge so
//! that begin and finish may run on different instances. Credentials keep the
//! serialized `Passkey` as their key material.

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::providers::{
    AuthenticatorSelection, CeremonyStart, CredentialResponse, DiscoverableResolver,
    DiscoveredLogin, ResidentKeyRequirement, UserVerificationPolicy, VerifiedLogin,
    VerifiedRegistration, WebAuthnProvider,
};
use crate::state::{Account, PasskeyCredential};
use crate::utils::{b64url_decode, b64url_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;
use webauthn_rs::prelude::{
    AuthenticationResult, CredentialID, DiscoverableAuthentication, DiscoverableKey, Passkey,
    PasskeyAuthentication, PasskeyRegistration, PublicKeyCredential, RegisterPublicKeyCredential,
    Url, Webauthn, WebauthnBuilder, WebauthnError,
};

/// Ceremony provider backed by `webauthn-rs`.
#[derive(Clone)]
pub struct WebauthnRsProvider {
    webauthn: Arc<Webauthn>,
}

impl WebauthnRsProvider {
    /// Build a provider from the relying party settings.
    ///
    /// The first expected origin is the primary one; the others are added as
    /// additional allowed origins. The challenge TTL doubles as the ceremony
    /// timeout advertised to the browser.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - RP id, name or origins are missing → `AuthError::WebAuthnNotConfigured`
    /// - An origin is not a URL or does not match the RP id → `AuthError::Config`
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        if !config.is_webauthn_configured() {
            return Err(AuthError::WebAuthnNotConfigured);
        }

        let mut origins = config.webauthn_expected_origins.iter().map(|origin| {
            Url::parse(origin)
                .map_err(|e| AuthError::Config(format!("Invalid WebAuthn origin {origin}: {e}")))
        });
        let primary = origins
            .next()
            .ok_or(AuthError::WebAuthnNotConfigured)??;

        let timeout = config
            .challenge_ttl()
            .to_std()
            .map_err(|e| AuthError::Config(format!("Invalid challenge TTL: {e}")))?;

        let mut builder = WebauthnBuilder::new(config.webauthn_rp_id.trim(), &primary)
            .map_err(|e| {
                AuthError::Config(format!(
                    "Invalid WebAuthn config (rp_id={}, origin={primary}): {e:?}",
                    config.webauthn_rp_id
                ))
            })?
            .rp_name(config.webauthn_rp_name.trim())
            .timeout(timeout);
        for origin in origins {
            builder = builder.append_allowed_origin(&origin?);
        }

        let webauthn = builder
            .build()
            .map_err(|e| AuthError::Config(format!("WebAuthn build error: {e:?}")))?;

        Ok(Self {
            webauthn: Arc::new(webauthn),
        })
    }
}

impl WebAuthnProvider for WebauthnRsProvider {
    async fn begin_registration(
        &self,
        account: &Account,
        user_handle: &[u8],
        exclude_credentials: &[String],
        selection: &AuthenticatorSelection,
    ) -> Result<CeremonyStart> {
        let user_id = Uuid::from_slice(user_handle)
            .map_err(|_| AuthError::InternalError("user handle is not 16 bytes".into()))?;
        let exclude: Vec<CredentialID> = exclude_credentials
            .iter()
            .filter_map(|id| b64url_decode(id).ok())
            .map(CredentialID::from)
            .collect();
        let exclude = if exclude.is_empty() { None } else { Some(exclude) };
        let name = account.display_name();

        let (options, state) = self
            .webauthn
            .start_passkey_registration(user_id, &name, &name, exclude)
            .map_err(internal("start registration"))?;

        let mut options = to_json(&options)?;
        apply_selection(&mut options, selection)?;
        start(options, &state)
    }

    async fn finish_registration(
        &self,
        state: &Value,
        response: &CredentialResponse,
    ) -> Result<VerifiedRegistration> {
        let state: PasskeyRegistration = from_json(state)?;
        let credential: RegisterPublicKeyCredential = from_payload(response)?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&credential, &state)
            .map_err(rejected("registration"))?;

        let key_material = to_json(&passkey)?;
        let flag = |name: &str| key_material.pointer(&format!("/cred/{name}")).and_then(Value::as_bool);

        Ok(VerifiedRegistration {
            credential_id: b64url_encode(passkey.cred_id()),
            sign_count: key_material
                .pointer("/cred/counter")
                .and_then(Value::as_u64)
                .and_then(|counter| u32::try_from(counter).ok())
                .unwrap_or_default(),
            attestation_type: key_material
                .pointer("/cred/attestation_format")
                .and_then(Value::as_str)
                .unwrap_or("none")
                .to_string(),
            backup_eligible: flag("backup_eligible"),
            backup_state: flag("backup_state"),
            key_material,
        })
    }

    async fn begin_login(&self, credentials: &[PasskeyCredential]) -> Result<CeremonyStart> {
        let passkeys = credentials
            .iter()
            .map(|credential| from_json::<Passkey>(&credential.key_material))
            .collect::<Result<Vec<_>>>()?;

        let (options, state) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(internal("start authentication"))?;

        start(to_json(&options)?, &state)
    }

    async fn begin_discoverable_login(&self) -> Result<CeremonyStart> {
        let (options, state) = self
            .webauthn
            .start_discoverable_authentication()
            .map_err(internal("start discoverable authentication"))?;

        start(to_json(&options)?, &state)
    }

    async fn finish_login(
        &self,
        state: &Value,
        response: &CredentialResponse,
        credential: &PasskeyCredential,
    ) -> Result<VerifiedLogin> {
        let state: PasskeyAuthentication = from_json(state)?;
        let assertion: PublicKeyCredential = from_payload(response)?;

        let result = self
            .webauthn
            .finish_passkey_authentication(&assertion, &state)
            .map_err(rejected("authentication"))?;

        verified(&result, credential)
    }

    async fn finish_discoverable_login<R: DiscoverableResolver>(
        &self,
        state: &Value,
        response: &CredentialResponse,
        resolver: &R,
    ) -> Result<DiscoveredLogin> {
        let state: DiscoverableAuthentication = from_json(state)?;
        let assertion: PublicKeyCredential = from_payload(response)?;

        let (user_id, _) = self
            .webauthn
            .identify_discoverable_authentication(&assertion)
            .map_err(rejected("discoverable identification"))?;

        let (account, credentials) = resolver.resolve(user_id.as_bytes()).await?;
        let credential = credentials
            .into_iter()
            .find(|credential| credential.credential_id == response.credential_id)
            .ok_or(AuthError::WebAuthnVerificationFailed)?;

        let passkey: Passkey = from_json(&credential.key_material)?;
        let keys = [DiscoverableKey::from(&passkey)];
        let result = self
            .webauthn
            .finish_discoverable_authentication(&assertion, state, &keys)
            .map_err(rejected("discoverable authentication"))?;

        let verified = verified(&result, &credential)?;
        Ok(DiscoveredLogin {
            account,
            credential,
            verified,
        })
    }
}

fn verified(result: &AuthenticationResult, credential: &PasskeyCredential) -> Result<VerifiedLogin> {
    let credential_id = b64url_encode(result.cred_id());
    if credential_id != credential.credential_id {
        tracing::warn!(
            expected = %credential.credential_id,
            "Assertion signed by a different credential"
        );
        return Err(AuthError::WebAuthnVerificationFailed);
    }

    let mut passkey: Passkey = from_json(&credential.key_material)?;
    let key_material = match passkey.update_credential(result) {
        Some(true) => Some(to_json(&passkey)?),
        _ => None,
    };

    Ok(VerifiedLogin {
        credential_id,
        sign_count: result.counter(),
        backup_eligible: result.backup_eligible(),
        backup_state: result.backup_state(),
        key_material,
    })
}

/// Overlay caller preferences on the generated authenticator selection.
///
/// Passkey state always requires user verification, so the options say so
/// too; a weaker preference would only let the browser skip a check that
/// finish then fails on.
fn apply_selection(options: &mut Value, selection: &AuthenticatorSelection) -> Result<()> {
    let Some(public_key) = options.get_mut("publicKey").and_then(Value::as_object_mut) else {
        return Err(AuthError::InternalError("creation options without publicKey".into()));
    };
    let Some(criteria) = public_key
        .entry("authenticatorSelection")
        .or_insert_with(|| json!({}))
        .as_object_mut()
    else {
        return Err(AuthError::InternalError("malformed authenticatorSelection".into()));
    };

    if let Some(resident_key) = &selection.resident_key {
        criteria.insert("residentKey".into(), to_json(resident_key)?);
        criteria.insert(
            "requireResidentKey".into(),
            Value::Bool(matches!(resident_key, ResidentKeyRequirement::Required)),
        );
    }
    if let Some(policy) = selection
        .user_verification
        .as_ref()
        .filter(|policy| !matches!(policy, UserVerificationPolicy::Required))
    {
        tracing::debug!(requested = ?policy, "Passkeys require user verification; preference ignored");
    }
    criteria.insert(
        "userVerification".into(),
        to_json(&UserVerificationPolicy::Required)?,
    );
    Ok(())
}

fn start(options: Value, state: &impl Serialize) -> Result<CeremonyStart> {
    let challenge = options
        .pointer("/publicKey/challenge")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::InternalError("ceremony options without challenge".into()))?
        .to_string();
    Ok(CeremonyStart {
        options,
        state: to_json(state)?,
        challenge,
    })
}

fn to_json(value: &impl Serialize) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| AuthError::InternalError(format!("Serialize ceremony data failed: {e}")))
}

fn from_json<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| AuthError::InternalError(format!("Deserialize ceremony data failed: {e}")))
}

fn from_payload<T: DeserializeOwned>(response: &CredentialResponse) -> Result<T> {
    serde_json::from_value(response.payload.clone())
        .map_err(|_| AuthError::InvalidRequest("malformed credential response".into()))
}

fn internal(stage: &'static str) -> impl FnOnce(WebauthnError) -> AuthError {
    move |e| AuthError::InternalError(format!("{stage} failed: {e:?}"))
}

fn rejected(stage: &'static str) -> impl FnOnce(WebauthnError) -> AuthError {
    move |e| {
        tracing::warn!(stage, error = ?e, "WebAuthn verification failed");
        AuthError::WebAuthnVerificationFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AuthConfig {
        AuthConfig::default().with_webauthn(
            "admin.example.com",
            "Belfast",
            vec![
                "https://admin.example.com".to_string(),
                "https://panel.admin.example.com".to_string(),
            ],
        )
    }

    fn account() -> Account {
        Account::new("alice", "hash".into(), "argon2id".into(), chrono::Utc::now())
    }

    #[test]
    fn test_from_config_requires_relying_party() {
        let result = WebauthnRsProvider::from_config(&AuthConfig::default());
        assert!(matches!(result, Err(AuthError::WebAuthnNotConfigured)));
    }

    #[test]
    fn test_from_config_rejects_bad_origin() {
        let config = AuthConfig::default().with_webauthn(
            "admin.example.com",
            "Belfast",
            vec!["not a url".to_string()],
        );
        assert!(matches!(
            WebauthnRsProvider::from_config(&config),
            Err(AuthError::Config(_))
        ));
    }

    /// First string stored under `key` anywhere in `value`.
    fn find_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
        match value {
            Value::Object(map) => map
                .get(key)
                .and_then(Value::as_str)
                .or_else(|| map.values().find_map(|v| find_str(v, key))),
            Value::Array(items) => items.iter().find_map(|v| find_str(v, key)),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_begin_registration_applies_selection() {
        let provider = WebauthnRsProvider::from_config(&configured()).unwrap();
        let selection = AuthenticatorSelection {
            resident_key: Some(ResidentKeyRequirement::Required),
            user_verification: None,
        };

        let start = provider
            .begin_registration(&account(), &[9u8; 16], &[], &selection)
            .await
            .unwrap();

        let criteria = start.options.pointer("/publicKey/authenticatorSelection").unwrap();
        assert_eq!(criteria["residentKey"], "required");
        assert_eq!(criteria["requireResidentKey"], true);
        assert_eq!(criteria["userVerification"], "required");
        assert_eq!(
            start.options.pointer("/publicKey/challenge").and_then(Value::as_str),
            Some(start.challenge.as_str())
        );
        assert!(!start.state.is_null());
    }

    #[tokio::test]
    async fn test_user_verification_matches_registration_state() {
        let provider = WebauthnRsProvider::from_config(&configured()).unwrap();
        for requested in [
            None,
            Some(UserVerificationPolicy::Preferred),
            Some(UserVerificationPolicy::Required),
        ] {
            let selection = AuthenticatorSelection {
                resident_key: None,
                user_verification: requested,
            };
            let start = provider
                .begin_registration(&account(), &[9u8; 16], &[], &selection)
                .await
                .unwrap();

            let advertised = start
                .options
                .pointer("/publicKey/authenticatorSelection/userVerification")
                .and_then(Value::as_str);
            assert_eq!(advertised, Some("required"));
            assert_eq!(advertised, find_str(&start.state, "policy"));
        }
    }

    #[tokio::test]
    async fn test_challenge_ttl_is_ceremony_timeout() {
        let provider =
            WebauthnRsProvider::from_config(&configured().with_challenge_ttl_seconds(90)).unwrap();

        let registration = provider
            .begin_registration(&account(), &[9u8; 16], &[], &AuthenticatorSelection::default())
            .await
            .unwrap();
        let discoverable = provider.begin_discoverable_login().await.unwrap();

        for start in [registration, discoverable] {
            assert_eq!(
                start.options.pointer("/publicKey/timeout").and_then(Value::as_u64),
                Some(90_000)
            );
        }
    }

    #[tokio::test]
    async fn test_begin_registration_rejects_short_handle() {
        let provider = WebauthnRsProvider::from_config(&configured()).unwrap();
        let result = provider
            .begin_registration(&account(), &[1, 2, 3], &[], &AuthenticatorSelection::default())
            .await;
        assert!(matches!(result, Err(AuthError::InternalError(_))));
    }

    #[tokio::test]
    async fn test_begin_discoverable_login_has_challenge() {
        let provider = WebauthnRsProvider::from_config(&configured()).unwrap();
        let start = provider.begin_discoverable_login().await.unwrap();
        assert!(!start.challenge.is_empty());
    }

    #[tokio::test]
    async fn test_finish_registration_rejects_garbage() {
        let provider = WebauthnRsProvider::from_config(&configured()).unwrap();
        let start = provider
            .begin_registration(&account(), &[9u8; 16], &[], &AuthenticatorSelection::default())
            .await
            .unwrap();
        let response = CredentialResponse::from_json(json!({
            "id": "AAAA",
            "rawId": "AAAA",
            "type": "public-key",
            "response": {
                "clientDataJSON": b64url_encode(br#"{"type":"webauthn.create"}"#),
                "attestationObject": "AAAA",
            },
            "extensions": {},
        }))
        .unwrap();

        let result = provider.finish_registration(&start.state, &response).await;
        assert!(matches!(
            result,
            Err(AuthError::WebAuthnVerificationFailed | AuthError::InvalidRequest(_))
        ));
    }
}
