//! Error types for the crypto crate.

use thiserror::Error;

/// Result type alias for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during envelope operations.
///
/// Webhook checks report [`crate::VerificationFailure`] instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Encoding error
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// The stored value is not a well-formed `iv:tag:ciphertext` envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The authentication tag did not verify (tampered payload or wrong key)
    #[error("Envelope authentication failed")]
    AuthenticationFailed,

    /// No usable encryption key is configured
    #[error("Encryption unavailable: {0}")]
    EncryptionUnavailable(String),
}
