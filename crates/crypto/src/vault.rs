//! Service-facing access to stored third-party credentials.
//!
//! [`TokenVault`] resolves the encryption key from configuration on every
//! call. When no usable key is configured, encryption is reported as
//! unavailable and the caller decides the fallback; the key is never
//! truncated or padded to make it fit.

use std::env::VarError;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::envelope::{looks_like_envelope, EncryptionKey, TokenCipher, KEY_HEX_LEN};
use crate::{CryptoError, Result};

/// Environment variable holding the 64-hex-character token key.
pub const DEFAULT_KEY_ENV: &str = "TOKEN_ENCRYPTION_KEY";

/// Where the token encryption key comes from.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// A key held in memory.
    Static(EncryptionKey),
    /// A hex key read from this environment variable on every call.
    Env(String),
    /// Encryption is switched off.
    Disabled,
}

impl KeySource {
    /// Build a cipher from the current key, or explain why there is none.
    pub fn cipher(&self) -> Result<TokenCipher> {
        match self {
            Self::Static(key) => Ok(TokenCipher::new(key.clone())),
            Self::Env(name) => {
                let value = Zeroizing::new(std::env::var(name).map_err(|e| match e {
                    VarError::NotPresent => {
                        CryptoError::EncryptionUnavailable(format!("{name} is not set"))
                    }
                    VarError::NotUnicode(_) => {
                        CryptoError::EncryptionUnavailable(format!("{name} is not valid UTF-8"))
                    }
                })?);
                TokenCipher::from_hex(&value).map_err(|_| {
                    CryptoError::EncryptionUnavailable(format!(
                        "{name} must be exactly {KEY_HEX_LEN} hex characters"
                    ))
                })
            }
            Self::Disabled => Err(CryptoError::EncryptionUnavailable(
                "token encryption is disabled".to_string(),
            )),
        }
    }
}

/// Encrypts tokens before they are persisted and recovers them on demand.
#[derive(Debug, Clone)]
pub struct TokenVault {
    source: KeySource,
}

impl TokenVault {
    /// Create a vault over a key source.
    pub fn new(source: KeySource) -> Self {
        Self { source }
    }

    /// Vault reading `TOKEN_ENCRYPTION_KEY` at call time.
    pub fn from_env() -> Self {
        Self::from_env_var(DEFAULT_KEY_ENV)
    }

    /// Vault reading the named variable at call time.
    pub fn from_env_var(name: impl Into<String>) -> Self {
        Self::new(KeySource::Env(name.into()))
    }

    /// Vault with an in-memory key.
    pub fn with_key(key: EncryptionKey) -> Self {
        Self::new(KeySource::Static(key))
    }

    /// Whether a usable key is currently configured.
    pub fn is_available(&self) -> bool {
        self.source.cipher().is_ok()
    }

    /// Encrypt a token, or `None` when encryption is unavailable.
    pub fn encrypt(&self, plaintext: &str) -> Option<String> {
        match self.try_encrypt(plaintext) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!(error = %e, "Token encryption unavailable");
                None
            }
        }
    }

    /// Encrypt a token, reporting why it could not be done.
    pub fn try_encrypt(&self, plaintext: &str) -> Result<String> {
        self.source.cipher()?.encrypt(plaintext)
    }

    /// Decrypt an envelope. Fails on malformed input, a missing key, or a
    /// tag that does not verify.
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        self.source.cipher()?.decrypt(envelope)
    }

    /// Recover a stored token, passing pre-encryption plaintext through.
    ///
    /// Values without the envelope shape are returned as-is. This is a
    /// migration aid for rows written before encryption, not a validity
    /// check.
    pub fn resolve(&self, stored: &str) -> Result<String> {
        if !looks_like_envelope(stored) {
            debug!("Stored token is legacy plaintext");
            return Ok(stored.to_string());
        }
        self.decrypt(stored)
    }

    /// Re-encrypt a stored token under `target`.
    ///
    /// Legacy plaintext is encrypted for the first time. The returned
    /// envelope replaces the stored one; envelopes are never edited in place.
    pub fn rotate(&self, stored: &str, target: &TokenCipher) -> Result<String> {
        let plaintext = Zeroizing::new(self.resolve(stored)?);
        target.encrypt(&plaintext)
    }
}

/// Mask a token for diagnostics, keeping at most four characters at each end.
pub fn redact(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "8f0e3b1cd2a4957e6b0c1d2e3f405162738495a6b7c8d9eafb0c1d2e3f405162";

    fn vault() -> TokenVault {
        TokenVault::with_key(EncryptionKey::from_hex(KEY).unwrap())
    }

    #[test]
    fn test_encrypt_then_resolve() {
        let v = vault();
        let stored = v.encrypt("EAAGtoken").unwrap();
        assert_ne!(stored, "EAAGtoken");
        assert_eq!(v.resolve(&stored).unwrap(), "EAAGtoken");
    }

    #[test]
    fn test_legacy_plaintext_passes_through() {
        let v = vault();
        assert_eq!(v.resolve("EAAGm0PX4ZCpsBA").unwrap(), "EAAGm0PX4ZCpsBA");
        assert_eq!(v.resolve("a:b:c").unwrap(), "a:b:c");
    }

    #[test]
    fn test_legacy_passes_through_without_key() {
        let v = TokenVault::new(KeySource::Disabled);
        assert_eq!(v.resolve("plain-token").unwrap(), "plain-token");
    }

    #[test]
    fn test_disabled_vault_returns_none() {
        let v = TokenVault::new(KeySource::Disabled);
        assert!(!v.is_available());
        assert!(v.encrypt("t").is_none());
        assert!(matches!(v.try_encrypt("t"), Err(CryptoError::EncryptionUnavailable(_))));
    }

    #[test]
    fn test_unset_env_key_is_unavailable() {
        let v = TokenVault::from_env_var("WHATRACK_TEST_KEY_NEVER_SET");
        assert!(v.encrypt("t").is_none());
    }

    #[test]
    fn test_short_env_key_is_not_padded() {
        let var = "WHATRACK_TEST_KEY_SHORT";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, &KEY[..60]) };
        let v = TokenVault::from_env_var(var);
        let err = v.try_encrypt("t").unwrap_err();
        assert!(matches!(err, CryptoError::EncryptionUnavailable(_)));
        assert!(!err.to_string().contains(&KEY[..60]));
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn test_unset_env_key_message() {
        let err = TokenVault::from_env_var("WHATRACK_TEST_KEY_NEVER_SET")
            .try_encrypt("t")
            .unwrap_err();
        assert_eq!(
            err,
            CryptoError::EncryptionUnavailable("WHATRACK_TEST_KEY_NEVER_SET is not set".into())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_env_key_is_reported_as_such() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let var = "WHATRACK_TEST_KEY_NOT_UNICODE";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, OsStr::from_bytes(b"8f0e\xff")) };
        let err = TokenVault::from_env_var(var).try_encrypt("t").unwrap_err();
        assert_eq!(
            err,
            CryptoError::EncryptionUnavailable(format!("{var} is not valid UTF-8"))
        );
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn test_env_key_roundtrip() {
        let var = "WHATRACK_TEST_KEY_VALID";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, KEY) };
        let v = TokenVault::from_env_var(var);
        let stored = v.encrypt("token").unwrap();
        assert_eq!(vault().decrypt(&stored).unwrap(), "token");
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn test_tampered_envelope_is_refused() {
        let v = vault();
        let stored = v.encrypt("token").unwrap();
        let mut parts: Vec<String> = stored.split(':').map(String::from).collect();
        let flipped = if parts[1].starts_with('0') { "1" } else { "0" };
        parts[1].replace_range(0..1, flipped);
        let tampered = parts.join(":");
        assert_eq!(v.resolve(&tampered), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn test_rotate_to_new_key() {
        let v = vault();
        let stored = v.encrypt("token").unwrap();
        let next_key = EncryptionKey::generate();
        let next = TokenCipher::new(next_key.clone());

        let rotated = v.rotate(&stored, &next).unwrap();
        assert_ne!(rotated, stored);
        assert_eq!(TokenVault::with_key(next_key).resolve(&rotated).unwrap(), "token");
        assert!(v.decrypt(&rotated).is_err());
    }

    #[test]
    fn test_rotate_encrypts_legacy() {
        let next = TokenCipher::new(EncryptionKey::generate());
        let rotated = vault().rotate("legacy-token", &next).unwrap();
        assert!(looks_like_envelope(&rotated));
        assert_eq!(next.decrypt(&rotated).unwrap(), "legacy-token");
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("EAAGm0PX4ZCpsBAKZC"), "EAAG…AKZC");
        assert_eq!(redact("short"), "****");
    }
}
