//! Meta webhook subscription handshake.
//!
//! When a webhook URL is registered, Meta sends a `GET` with `hub.mode`,
//! `hub.verify_token` and `hub.challenge`. The endpoint must echo the
//! challenge only if the token matches the one configured for the app.

use thiserror::Error;
use tracing::{info, warn};

use crate::timing::constant_time_compare;

/// Query parameters of a subscription request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// `hub.mode`
    pub mode: Option<String>,
    /// `hub.verify_token`
    pub verify_token: Option<String>,
    /// `hub.challenge`
    pub challenge: Option<String>,
}

impl SubscriptionRequest {
    /// Collect the `hub.*` parameters from decoded query pairs.
    ///
    /// Unknown keys are ignored; a repeated key keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "hub.mode" => request.mode = Some(value.into()),
                "hub.verify_token" => request.verify_token = Some(value.into()),
                "hub.challenge" => request.challenge = Some(value.into()),
                _ => {}
            }
        }
        request
    }
}

/// Why a subscription handshake was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No verify token is configured
    #[error("verify token is not configured")]
    TokenNotConfigured,

    /// `hub.mode` is absent or not `subscribe`
    #[error("hub.mode is not `subscribe`")]
    WrongMode,

    /// `hub.verify_token` is absent or different
    #[error("verify token does not match")]
    TokenMismatch,

    /// `hub.challenge` is absent
    #[error("hub.challenge is missing")]
    MissingChallenge,
}

impl SubscriptionError {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TokenNotConfigured => "verify_token_not_configured",
            Self::WrongMode => "wrong_mode",
            Self::TokenMismatch => "verify_token_mismatch",
            Self::MissingChallenge => "missing_challenge",
        }
    }
}

/// Validate a handshake and return the challenge to echo back.
pub fn verify_subscription(
    request: &SubscriptionRequest,
    expected_token: Option<&str>,
) -> Result<String, SubscriptionError> {
    let result = evaluate(request, expected_token);
    match &result {
        Ok(_) => info!("Webhook subscription verified"),
        Err(e) => warn!(reason = e.reason(), "Webhook subscription rejected: {}", e),
    }
    result
}

fn evaluate(
    request: &SubscriptionRequest,
    expected_token: Option<&str>,
) -> Result<String, SubscriptionError> {
    let expected = expected_token
        .filter(|t| !t.is_empty())
        .ok_or(SubscriptionError::TokenNotConfigured)?;

    if request.mode.as_deref() != Some("subscribe") {
        return Err(SubscriptionError::WrongMode);
    }

    let provided = request
        .verify_token
        .as_deref()
        .ok_or(SubscriptionError::TokenMismatch)?;
    if !constant_time_compare(provided.as_bytes(), expected.as_bytes()) {
        return Err(SubscriptionError::TokenMismatch);
    }

    request
        .challenge
        .clone()
        .ok_or(SubscriptionError::MissingChallenge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: &str, token: &str, challenge: &str) -> SubscriptionRequest {
        SubscriptionRequest::from_pairs([
            ("hub.mode", mode),
            ("hub.verify_token", token),
            ("hub.challenge", challenge),
        ])
    }

    #[test]
    fn test_valid_handshake_echoes_challenge() {
        let req = request("subscribe", "tok", "1158201444");
        assert_eq!(verify_subscription(&req, Some("tok")).unwrap(), "1158201444");
    }

    #[test]
    fn test_wrong_token() {
        let req = request("subscribe", "guess", "c");
        assert_eq!(
            verify_subscription(&req, Some("tok")),
            Err(SubscriptionError::TokenMismatch)
        );
    }

    #[test]
    fn test_wrong_mode() {
        let req = request("unsubscribe", "tok", "c");
        assert_eq!(verify_subscription(&req, Some("tok")), Err(SubscriptionError::WrongMode));
    }

    #[test]
    fn test_unconfigured_token_fails_closed() {
        let req = request("subscribe", "", "c");
        assert_eq!(verify_subscription(&req, Some("")), Err(SubscriptionError::TokenNotConfigured));
        assert_eq!(verify_subscription(&req, None), Err(SubscriptionError::TokenNotConfigured));
    }

    #[test]
    fn test_missing_challenge() {
        let req = SubscriptionRequest::from_pairs([("hub.mode", "subscribe"), ("hub.verify_token", "tok")]);
        assert_eq!(
            verify_subscription(&req, Some("tok")),
            Err(SubscriptionError::MissingChallenge)
        );
    }

    #[test]
    fn test_unknown_pairs_ignored() {
        let req = SubscriptionRequest::from_pairs([("utm_source", "x"), ("hub.mode", "subscribe")]);
        assert_eq!(req.mode.as_deref(), Some("subscribe"));
        assert!(req.verify_token.is_none());
    }
}
