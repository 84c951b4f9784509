//! HMAC implementations for the hash algorithms webhook senders use.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Compute a raw HMAC-SHA256 digest.
///
/// # Arguments
/// * `key` - Secret key bytes
/// * `message` - Message to sign, exactly as it travels on the wire
pub fn hmac_sha256_bytes(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key)
        .expect("HMAC can take key of any size");
    mac.update(message);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Generate HMAC-SHA256 signature as a lowercase hex string.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> String {
    hex::encode(hmac_sha256_bytes(key, message))
}

/// Compute a raw HMAC-SHA1 digest.
pub(crate) fn hmac_sha1_bytes(key: &[u8], message: &[u8]) -> [u8; 20] {
    let mut mac = HmacSha1::new_from_slice(key)
        .expect("HMAC can take key of any size");
    mac.update(message);
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Generate HMAC-SHA1 signature as a lowercase hex string.
///
/// Only for the legacy `X-Hub-Signature` header.
pub fn hmac_sha1(key: &[u8], message: &[u8]) -> String {
    hex::encode(hmac_sha1_bytes(key, message))
}
