//! AES-256-GCM token envelopes.
//!
//! Access tokens are stored as `iv_hex:tag_hex:ciphertext_hex` with a
//! 16-byte IV and a 16-byte tag. Every encryption draws a fresh IV.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{CryptoError, Result};

/// AES-256-GCM with a 128-bit nonce and 128-bit tag.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// IV length in bytes.
pub const IV_LEN: usize = 16;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// Key length as hex characters.
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// 256-bit encryption key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key given as exactly 64 hex characters.
    ///
    /// Any other length is rejected; keys are never truncated or padded.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        if hex_key.len() != KEY_HEX_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} hex characters, got {}",
                KEY_HEX_LEN,
                hex_key.len()
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(hex_key, &mut bytes)
            .map_err(|_| CryptoError::InvalidKey("key is not valid hex".to_string()))?;
        Ok(Self(bytes))
    }

    /// Generate a random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Hex form, suitable for `TOKEN_ENCRYPTION_KEY`.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(**redacted**)")
    }
}

/// Generate a fresh key and return it as 64 hex characters.
pub fn generate_key_hex() -> Zeroizing<String> {
    EncryptionKey::generate().to_hex()
}

/// A parsed `iv:tag:ciphertext` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    iv: [u8; IV_LEN],
    tag: [u8; TAG_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Assemble an envelope from its parts.
    pub fn new(iv: [u8; IV_LEN], tag: [u8; TAG_LEN], ciphertext: Vec<u8>) -> Self {
        Self { iv, tag, ciphertext }
    }

    /// Initialization vector.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Authentication tag.
    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    /// Encrypted payload.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

fn decode_fixed<const N: usize>(segment: &str, name: &str) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    if segment.len() != N * 2 {
        return Err(CryptoError::MalformedEnvelope(format!(
            "{} must be {} bytes, got {} hex characters",
            name,
            N,
            segment.len()
        )));
    }
    hex::decode_to_slice(segment, &mut out)
        .map_err(|_| CryptoError::MalformedEnvelope(format!("{name} is not valid hex")))?;
    Ok(out)
}

impl FromStr for Envelope {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [iv, tag, ciphertext] = parts.as_slice() else {
            return Err(CryptoError::MalformedEnvelope(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        };

        let ciphertext = hex::decode(ciphertext)
            .map_err(|_| CryptoError::MalformedEnvelope("ciphertext is not valid hex".to_string()))?;

        Ok(Self {
            iv: decode_fixed(iv, "iv")?,
            tag: decode_fixed(tag, "tag")?,
            ciphertext,
        })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext)
        )
    }
}

/// Whether a stored value has the envelope shape: three colon-separated
/// segments, the first two exactly 32 hex characters.
///
/// Only distinguishes envelopes from pre-encryption plaintext rows. It says
/// nothing about whether the value will decrypt.
pub fn looks_like_envelope(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    let is_hex32 = |s: &str| s.len() == IV_LEN * 2 && s.bytes().all(|b| b.is_ascii_hexdigit());
    parts.len() == 3 && is_hex32(parts[0]) && is_hex32(parts[1])
}

/// Encrypts and decrypts token envelopes under one key.
#[derive(Clone)]
pub struct TokenCipher {
    key: EncryptionKey,
}

impl TokenCipher {
    /// Create a cipher for `key`.
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Create a cipher from a 64-hex-character key.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        EncryptionKey::from_hex(hex_key).map(Self::new)
    }

    fn aead(&self) -> Result<Aes256Gcm16> {
        Aes256Gcm16::new_from_slice(self.key.as_bytes())
            .map_err(|_| CryptoError::InvalidKey("key must be 32 bytes".to_string()))
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn encrypt_envelope(&self, plaintext: &[u8]) -> Result<Envelope> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = plaintext.to_vec();
        let tag = self
            .aead()?
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CryptoError::EncodingError("plaintext too long for AES-GCM".to_string()))?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);
        Ok(Envelope::new(iv, tag_bytes, buffer))
    }

    /// Encrypt a token and return the envelope string.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.encrypt_envelope(plaintext.as_bytes())
            .map(|envelope| envelope.to_string())
    }

    /// Decrypt a parsed envelope.
    ///
    /// Fails with [`CryptoError::AuthenticationFailed`] if the tag does not
    /// verify; no plaintext is produced in that case.
    pub fn decrypt_envelope(&self, envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
        let mut buffer = Zeroizing::new(envelope.ciphertext.clone());
        self.aead()?
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(&envelope.iv),
                b"",
                &mut buffer,
                Tag::<U16>::from_slice(&envelope.tag),
            )
            .map_err(|_| {
                warn!(
                    ciphertext_len = envelope.ciphertext.len(),
                    "Token envelope failed authentication"
                );
                CryptoError::AuthenticationFailed
            })?;
        Ok(buffer)
    }

    /// Decrypt an envelope string back into the token.
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        let parsed: Envelope = envelope.parse().inspect_err(|e| {
            warn!(error = %e, "Token envelope is malformed");
        })?;

        let plaintext = self.decrypt_envelope(&parsed)?;
        String::from_utf8(plaintext.to_vec()).map_err(|e| {
            e.into_bytes().zeroize();
            CryptoError::EncodingError("decrypted token is not valid UTF-8".to_string())
        })
    }
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher").field("key", &self.key).finish()
    }
}
