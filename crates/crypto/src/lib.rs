//! Cryptographic primitives for Whatrack.
//!
//! This crate provides:
//! - HMAC signing and constant-time webhook signature verification
//!   (`X-Hub-Signature-256`, plus the legacy `X-Hub-Signature` SHA-1 form)
//! - The Meta webhook subscription handshake
//! - AES-256-GCM envelopes for third-party access tokens stored at rest
//!
//! Every check fails closed: a missing secret, a malformed header or a
//! tampered envelope is a rejection, never a pass-through.
//!
//! # Example
//!
//! ```rust
//! use whatrack_crypto::{sign_payload, SignatureVerifier};
//!
//! let body = br#"{"a":1}"#;
//! let header = sign_payload(b"shh", body);
//!
//! let verifier = SignatureVerifier::with_secret("shh");
//! assert!(verifier.verify(body, Some(&header)));
//! assert!(!verifier.verify(body, None));
//! ```

#![warn(missing_docs)]

mod envelope;
mod error;
mod hmac_impl;
mod rejection;
mod subscription;
mod timing;
mod vault;
mod webhook;

#[cfg(feature = "wasm")]
mod wasm;

pub use envelope::{
    generate_key_hex, looks_like_envelope, EncryptionKey, Envelope, TokenCipher, IV_LEN, KEY_HEX_LEN,
    TAG_LEN,
};
pub use error::{CryptoError, Result};
pub use hmac_impl::{hmac_sha1, hmac_sha256, hmac_sha256_bytes};
pub use rejection::Rejection;
pub use subscription::{verify_subscription, SubscriptionError, SubscriptionRequest};
pub use timing::constant_time_compare;
pub use vault::{redact, KeySource, TokenVault, DEFAULT_KEY_ENV};
pub use webhook::{
    sign_payload, verify_signature_header, SecretSource, SignatureScheme, SignatureVerifier,
    VerificationFailure, DEFAULT_SECRET_ENV,
};
