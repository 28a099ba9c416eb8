//! Authentication constants.
//!
//! This module contains constant values used throughout the authentication system.

/// Challenge purpose tags persisted alongside pending ceremonies.
pub mod purposes {
    /// Passkey registration ceremony.
    pub const WEBAUTHN_REGISTER: &str = "webauthn.register";

    /// Passkey authentication ceremony (named or discoverable).
    pub const WEBAUTHN_AUTH: &str = "webauthn.auth";
}

/// Audit action names emitted to the [`AuditSink`](crate::providers::AuditSink).
pub mod audit_actions {
    /// Password login succeeded.
    pub const LOGIN_SUCCESS: &str = "login.success";

    /// Password login failed (wrong password).
    pub const LOGIN_FAIL: &str = "login.fail";

    /// Session revoked by its owner.
    pub const LOGOUT: &str = "logout";

    /// Password changed; other sessions revoked.
    pub const PASSWORD_CHANGE: &str = "password.change";

    /// Passkey registered.
    pub const PASSKEY_ADD: &str = "passkey.add";

    /// Passkey registration rejected (forged challenge or attestation).
    pub const PASSKEY_ADD_FAIL: &str = "passkey.add.fail";

    /// Passkey deleted by its owner.
    pub const PASSKEY_REMOVE: &str = "passkey.remove";

    /// Passkey authentication ceremony failed.
    pub const PASSKEY_LOGIN_FAIL: &str = "passkey.login.fail";
}

/// Login method identifiers recorded in audit metadata.
pub mod login_methods {
    /// Username and password.
    pub const PASSWORD: &str = "password";

    /// WebAuthn/FIDO2 passkey authentication.
    pub const PASSKEY: &str = "passkey";
}

/// Algorithm tag stored next to every password hash.
pub const PASSWORD_ALGORITHM_ARGON2ID: &str = "argon2id";

/// Random bytes in session CSRF tokens.
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Random bytes in WebAuthn user handles.
pub const USER_HANDLE_BYTES: usize = 16;
