//! WASM bindings for edge runtimes that receive webhooks directly.

use wasm_bindgen::prelude::*;

/// Compute the `sha256=<hex>` header value for a payload.
#[wasm_bindgen]
pub fn sign_webhook_payload(secret: &str, body: &str) -> String {
    crate::sign_payload(secret.as_bytes(), body.as_bytes())
}

/// Verify an `X-Hub-Signature-256` header against the raw body.
///
/// # Arguments
/// * `secret` - The app secret
/// * `body` - The request body exactly as received
/// * `header` - The signature header value, if present
///
/// # Returns
/// true if the signature matches, false otherwise
#[wasm_bindgen]
pub fn verify_webhook_signature(secret: &str, body: &str, header: Option<String>) -> bool {
    crate::SignatureVerifier::with_secret(secret).verify(body.as_bytes(), header.as_deref())
}

/// Verify a legacy `X-Hub-Signature` (SHA-1) header.
#[wasm_bindgen]
pub fn verify_webhook_signature_sha1(secret: &str, body: &str, header: Option<String>) -> bool {
    crate::SignatureVerifier::with_secret(secret)
        .scheme(crate::SignatureScheme::Sha1)
        .verify(body.as_bytes(), header.as_deref())
}

/// Whether a stored value has the token envelope shape.
#[wasm_bindgen]
pub fn is_token_envelope(value: &str) -> bool {
    crate::looks_like_envelope(value)
}
