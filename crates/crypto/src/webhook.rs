//! Webhook signature verification.
//!
//! Meta signs every webhook delivery with the app secret and sends the digest
//! in `X-Hub-Signature-256: sha256=<hex>`. Verification must run on the body
//! bytes exactly as received: re-serialising parsed JSON reorders keys and
//! changes whitespace, which changes the digest.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::hmac_impl::{hmac_sha1_bytes, hmac_sha256_bytes};
use crate::rejection::Rejection;
use crate::timing::constant_time_compare;

/// Environment variable holding the Meta app secret.
pub const DEFAULT_SECRET_ENV: &str = "META_APP_SECRET";

/// Digest algorithm and header format used by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureScheme {
    /// `X-Hub-Signature-256: sha256=<hex>`
    #[default]
    Sha256,
    /// Legacy `X-Hub-Signature: sha1=<hex>`
    Sha1,
}

impl SignatureScheme {
    /// Prefix the header value must start with.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256=",
            Self::Sha1 => "sha1=",
        }
    }

    /// Name of the request header carrying the signature.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::Sha256 => "X-Hub-Signature-256",
            Self::Sha1 => "X-Hub-Signature",
        }
    }

    /// Scheme whose header is `name`, compared case-insensitively.
    pub fn from_header_name(name: &str) -> Option<Self> {
        [Self::Sha256, Self::Sha1]
            .into_iter()
            .find(|scheme| scheme.header_name().eq_ignore_ascii_case(name))
    }

    /// Raw digest length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha1 => 20,
        }
    }

    fn digest(self, secret: &[u8], body: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => hmac_sha256_bytes(secret, body).to_vec(),
            Self::Sha1 => hmac_sha1_bytes(secret, body).to_vec(),
        }
    }

    /// Produce the full header value (`<prefix><hex>`) for `body`.
    pub fn sign(self, secret: &[u8], body: &[u8]) -> String {
        format!("{}{}", self.prefix(), hex::encode(self.digest(secret, body)))
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Sha1 => f.write_str("sha1"),
        }
    }
}

/// Why a delivery was rejected.
///
/// Each variant is logged with its own `reason` so a misconfigured secret is
/// distinguishable from a forged request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// No shared secret is configured
    #[error("webhook secret is not configured")]
    SecretNotConfigured,

    /// The signature header is absent or empty
    #[error("signature header is missing")]
    MissingHeader,

    /// The header does not start with the expected algorithm prefix
    #[error("signature header is missing the `{expected}` prefix")]
    MissingPrefix {
        /// Prefix that was expected
        expected: &'static str,
    },

    /// The digest after the prefix is not valid hex
    #[error("signature digest is not valid hex")]
    InvalidHex,

    /// The decoded digest has the wrong length
    #[error("signature digest is {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Length of the locally computed digest
        expected: usize,
        /// Length of the decoded header digest
        actual: usize,
    },

    /// The digest does not match the body
    #[error("signature does not match payload")]
    DigestMismatch,
}

impl VerificationFailure {
    /// Short machine-readable reason, used as a log field.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SecretNotConfigured => "secret_not_configured",
            Self::MissingHeader => "missing_header",
            Self::MissingPrefix { .. } => "missing_prefix",
            Self::InvalidHex => "invalid_hex",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::DigestMismatch => "digest_mismatch",
        }
    }
}

/// Where the shared secret comes from.
#[derive(Clone)]
pub enum SecretSource {
    /// A secret held in memory.
    Static(Zeroizing<Vec<u8>>),
    /// A secret read from this environment variable on every call.
    Env(String),
}

impl SecretSource {
    /// Resolve the secret. Unset and empty values both count as not configured.
    pub fn resolve(&self) -> Option<Zeroizing<Vec<u8>>> {
        match self {
            Self::Static(secret) if secret.is_empty() => None,
            Self::Static(secret) => Some(secret.clone()),
            Self::Env(name) => std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .map(|value| Zeroizing::new(value.into_bytes())),
        }
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(**redacted**)"),
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
        }
    }
}

/// Verifies inbound webhook signatures against a shared secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    source: SecretSource,
    scheme: SignatureScheme,
}

impl SignatureVerifier {
    /// Create a verifier for the given secret source (SHA-256 scheme).
    pub fn new(source: SecretSource) -> Self {
        Self {
            source,
            scheme: SignatureScheme::default(),
        }
    }

    /// Create a verifier with an in-memory secret.
    pub fn with_secret(secret: impl AsRef<[u8]>) -> Self {
        Self::new(SecretSource::Static(Zeroizing::new(secret.as_ref().to_vec())))
    }

    /// Create a verifier reading `META_APP_SECRET` at call time.
    pub fn from_env() -> Self {
        Self::from_env_var(DEFAULT_SECRET_ENV)
    }

    /// Create a verifier reading the named variable at call time.
    pub fn from_env_var(name: impl Into<String>) -> Self {
        Self::new(SecretSource::Env(name.into()))
    }

    /// Use a different signature scheme.
    #[must_use]
    pub fn scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// The scheme this verifier expects.
    pub fn signature_scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Check a delivery and report exactly why it failed.
    ///
    /// `body` must be the raw request body; `header` the signature header
    /// value if the request carried one.
    pub fn check(&self, body: &[u8], header: Option<&str>) -> Result<(), VerificationFailure> {
        let result = self.evaluate(body, header);
        match &result {
            Ok(()) => debug!(scheme = %self.scheme, body_len = body.len(), "Webhook signature verified"),
            Err(failure) => warn!(
                scheme = %self.scheme,
                reason = failure.reason(),
                body_len = body.len(),
                "Webhook signature rejected: {}",
                failure
            ),
        }
        result
    }

    /// `true` only when the header carries a valid signature for `body`.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> bool {
        self.check(body, header).is_ok()
    }

    /// Check a delivery, returning the rejection a route handler should
    /// answer with.
    pub fn authorize(&self, body: &[u8], header: Option<&str>) -> Result<(), Rejection> {
        self.check(body, header).map_err(Rejection::from)
    }

    fn evaluate(&self, body: &[u8], header: Option<&str>) -> Result<(), VerificationFailure> {
        let secret = self
            .source
            .resolve()
            .ok_or(VerificationFailure::SecretNotConfigured)?;

        let header = header
            .filter(|value| !value.is_empty())
            .ok_or(VerificationFailure::MissingHeader)?;

        let expected_prefix = self.scheme.prefix();
        let provided_hex = header
            .strip_prefix(expected_prefix)
            .ok_or(VerificationFailure::MissingPrefix {
                expected: expected_prefix,
            })?;

        let provided = hex::decode(provided_hex).map_err(|_| VerificationFailure::InvalidHex)?;
        let computed = self.scheme.digest(&secret, body);

        if provided.len() != computed.len() {
            return Err(VerificationFailure::LengthMismatch {
                expected: computed.len(),
                actual: provided.len(),
            });
        }

        if constant_time_compare(&computed, &provided) {
            Ok(())
        } else {
            Err(VerificationFailure::DigestMismatch)
        }
    }
}

/// Sign `body` the way Meta does: `sha256=<hex hmac>`.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    SignatureScheme::Sha256.sign(secret, body)
}

/// Verify an `X-Hub-Signature-256` header against `META_APP_SECRET`.
///
/// The secret is read from the environment on every call.
pub fn verify_signature_header(body: &[u8], header: Option<&str>) -> bool {
    SignatureVerifier::from_env().verify(body, header)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"a":1}"#;
    const SHH_SHA256: &str = "sha256=dfb8cf3fc9778c70386e30f5e0776d37f9ee9c8756d3cbd7df0902150644358d";
    const SHH_SHA1: &str = "sha1=0a7437ae1352506a802384b30c4cca6fe4546b7b";

    #[test]
    fn test_known_digest_for_shh() {
        assert_eq!(sign_payload(b"shh", BODY), SHH_SHA256);
        let verifier = SignatureVerifier::with_secret("shh");
        assert!(verifier.verify(BODY, Some(SHH_SHA256)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let verifier = SignatureVerifier::with_secret("not-shh");
        assert_eq!(
            verifier.check(BODY, Some(SHH_SHA256)),
            Err(VerificationFailure::DigestMismatch)
        );
    }

    #[test]
    fn test_truncated_digest_rejected() {
        let verifier = SignatureVerifier::with_secret("shh");
        let truncated = &SHH_SHA256[..SHH_SHA256.len() - 2];
        assert_eq!(
            verifier.check(BODY, Some(truncated)),
            Err(VerificationFailure::LengthMismatch {
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn test_odd_length_digest_is_invalid_hex() {
        let verifier = SignatureVerifier::with_secret("shh");
        let truncated = &SHH_SHA256[..SHH_SHA256.len() - 1];
        assert_eq!(
            verifier.check(BODY, Some(truncated)),
            Err(VerificationFailure::InvalidHex)
        );
    }

    #[test]
    fn test_uppercase_digest_accepted() {
        let verifier = SignatureVerifier::with_secret("shh");
        let upper = format!("sha256={}", SHH_SHA256["sha256=".len()..].to_uppercase());
        assert!(verifier.verify(BODY, Some(&upper)));
    }

    #[test]
    fn test_missing_header() {
        let verifier = SignatureVerifier::with_secret("shh");
        assert_eq!(verifier.check(BODY, None), Err(VerificationFailure::MissingHeader));
        assert_eq!(verifier.check(BODY, Some("")), Err(VerificationFailure::MissingHeader));
    }

    #[test]
    fn test_missing_prefix() {
        let verifier = SignatureVerifier::with_secret("shh");
        let bare = &SHH_SHA256["sha256=".len()..];
        assert_eq!(
            verifier.check(BODY, Some(bare)),
            Err(VerificationFailure::MissingPrefix { expected: "sha256=" })
        );
        assert!(!verifier.verify(BODY, Some(SHH_SHA1)));
    }

    #[test]
    fn test_empty_secret_is_not_configured() {
        let verifier = SignatureVerifier::with_secret("");
        let header = sign_payload(b"", BODY);
        assert_eq!(
            verifier.check(BODY, Some(&header)),
            Err(VerificationFailure::SecretNotConfigured)
        );
    }

    #[test]
    fn test_secret_checked_before_header() {
        let verifier = SignatureVerifier::from_env_var("WHATRACK_TEST_SECRET_NEVER_SET");
        assert_eq!(verifier.check(BODY, None), Err(VerificationFailure::SecretNotConfigured));
    }

    #[test]
    fn test_env_secret_read_per_call() {
        let var = "WHATRACK_TEST_SECRET_PER_CALL";
        let verifier = SignatureVerifier::from_env_var(var);
        assert!(!verifier.verify(BODY, Some(SHH_SHA256)));

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "shh") };
        assert!(verifier.verify(BODY, Some(SHH_SHA256)));

        unsafe { std::env::set_var(var, "rotated") };
        assert!(!verifier.verify(BODY, Some(SHH_SHA256)));
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn test_sha1_scheme() {
        let verifier = SignatureVerifier::with_secret("shh").scheme(SignatureScheme::Sha1);
        assert!(verifier.verify(BODY, Some(SHH_SHA1)));
        assert!(!verifier.verify(BODY, Some(SHH_SHA256)));
        assert_eq!(verifier.signature_scheme().header_name(), "X-Hub-Signature");
    }

    #[test]
    fn test_scheme_from_header_name() {
        assert_eq!(
            SignatureScheme::from_header_name("x-hub-signature-256"),
            Some(SignatureScheme::Sha256)
        );
        assert_eq!(
            SignatureScheme::from_header_name("X-Hub-Signature"),
            Some(SignatureScheme::Sha1)
        );
        assert_eq!(SignatureScheme::from_header_name("X-Hub-Signature-1"), None);
    }

    #[test]
    fn test_whitespace_change_invalidates() {
        let verifier = SignatureVerifier::with_secret("shh");
        assert!(!verifier.verify(br#"{"a": 1}"#, Some(SHH_SHA256)));
    }

    #[test]
    fn test_authorize_maps_to_unauthorized() {
        let verifier = SignatureVerifier::with_secret("shh");
        let rejection = verifier.authorize(BODY, None).unwrap_err();
        assert_eq!(rejection.status_code(), 401);
        assert!(verifier.authorize(BODY, Some(SHH_SHA256)).is_ok());
    }

    #[test]
    fn test_debug_redacts_static_secret() {
        let verifier = SignatureVerifier::with_secret("super-secret");
        let rendered = format!("{:?}", verifier);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warnings_for(verifier: &SignatureVerifier, header: Option<&str>) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let _ = verifier.check(BODY, header);
        });
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_each_failure_logs_its_reason() {
        let verifier = SignatureVerifier::with_secret("shh");
        let bare = &SHH_SHA256["sha256=".len()..];
        let truncated = &SHH_SHA256[..SHH_SHA256.len() - 2];
        let odd = &SHH_SHA256[..SHH_SHA256.len() - 1];
        let forged = sign_payload(b"not-shh", BODY);

        let cases = [
            (SignatureVerifier::with_secret(""), Some(SHH_SHA256), "secret_not_configured"),
            (verifier.clone(), None, "missing_header"),
            (verifier.clone(), Some(bare), "missing_prefix"),
            (verifier.clone(), Some(odd), "invalid_hex"),
            (verifier.clone(), Some(truncated), "length_mismatch"),
            (verifier.clone(), Some(forged.as_str()), "digest_mismatch"),
        ];

        for (verifier, header, reason) in cases {
            let output = warnings_for(&verifier, header);
            assert!(output.contains("WARN"), "no warning for {reason}: {output}");
            assert!(output.contains(reason), "reason {reason} missing from: {output}");
            assert!(!output.contains("shh\""), "secret leaked: {output}");
        }
    }

    #[test]
    fn test_success_logs_no_warning() {
        let verifier = SignatureVerifier::with_secret("shh");
        assert!(warnings_for(&verifier, Some(SHH_SHA256)).is_empty());
    }

    #[test]
    fn test_failure_reasons_are_distinct() {
        let reasons = [
            VerificationFailure::SecretNotConfigured.reason(),
            VerificationFailure::MissingHeader.reason(),
            VerificationFailure::MissingPrefix { expected: "sha256=" }.reason(),
            VerificationFailure::InvalidHex.reason(),
            VerificationFailure::LengthMismatch { expected: 32, actual: 1 }.reason(),
            VerificationFailure::DigestMismatch.reason(),
        ];
        let unique: std::collections::HashSet<_> = reasons.iter().collect();
        assert_eq!(unique.len(), reasons.len());
    }
}
