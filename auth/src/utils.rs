//! Utility functions for authentication.

use crate::error::{AuthError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::net::{IpAddr, SocketAddr};

/// Fold a username for lookup and uniqueness checks.
///
/// # Examples
///
/// ```
/// use belfast_auth::utils::normalize_username;
///
/// assert_eq!(normalize_username("  Commander "), "commander");
/// assert_eq!(normalize_username("   "), "");
/// ```
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Canonicalize a remote address for rate-limit keys.
///
/// Strips the port from `host:port` and `[v6]:port` forms and prints the
/// address in its canonical text form. Unparseable input is only trimmed.
///
/// # Examples
///
/// ```
/// use belfast_auth::utils::normalize_ip;
///
/// assert_eq!(normalize_ip("203.0.113.9:52100"), "203.0.113.9");
/// assert_eq!(normalize_ip("[2001:DB8::1]:443"), "2001:db8::1");
/// assert_eq!(normalize_ip("2001:db8::1"), "2001:db8::1");
/// ```
#[must_use]
pub fn normalize_ip(remote: &str) -> String {
    let remote = remote.trim();
    if let Ok(addr) = remote.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Ok(ip) = remote.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return ip.to_string();
    }
    remote.to_string()
}

/// Composite rate-limit key `"<ip>:<identity>"`, or just the IP when no
/// identity is known yet.
///
/// # Examples
///
/// ```
/// use belfast_auth::utils::rate_limit_key;
///
/// assert_eq!(rate_limit_key("10.0.0.1:9000", Some("Alice")), "10.0.0.1:alice");
/// assert_eq!(rate_limit_key("10.0.0.1", None), "10.0.0.1");
/// ```
#[must_use]
pub fn rate_limit_key(remote: &str, identity: Option<&str>) -> String {
    let ip = normalize_ip(remote);
    match identity.map(normalize_username) {
        Some(identity) if !identity.is_empty() => format!("{ip}:{identity}"),
        _ => ip,
    }
}

/// Fill a buffer from the thread-local CSPRNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Random base64url token with `len` bytes of entropy.
#[must_use]
pub fn random_token(len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(len))
}

/// Encode bytes as unpadded base64url.
#[must_use]
pub fn b64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded (or padded) base64url.
///
/// # Errors
///
/// Returns [`AuthError::InvalidRequest`] if the input is not base64url.
pub fn b64url_decode(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|_| AuthError::InvalidRequest("invalid base64url".into()))
}

/// Extract the `challenge` member from base64url encoded client data.
///
/// # Errors
///
/// Returns [`AuthError::InvalidRequest`] if the client data cannot be
/// decoded or has no string `challenge` member.
pub fn client_data_challenge(client_data_json: &str) -> Result<String> {
    let raw = b64url_decode(client_data_json)?;
    let client_data: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|_| AuthError::InvalidRequest("client data is not JSON".into()))?;
    client_data
        .get("challenge")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| AuthError::InvalidRequest("client data has no challenge".into()))
}
