//! Webhook signing, verification and subscription handshake

use crate::commands::input::read_body;
use std::path::Path;
use whatrack_cli::output::{format_duration, Status};
use whatrack_core::config::Config;
use whatrack_core::error::{Error, ErrorCode, Result};
use whatrack_crypto::{
    verify_subscription, Rejection, SignatureScheme, SubscriptionError, SubscriptionRequest,
    VerificationFailure,
};
use whatrack_telemetry::{metrics, Timer};

/// Print the signature header a sender would attach to `body`
pub fn sign(
    config: &Config,
    body: Option<&Path>,
    scheme: Option<SignatureScheme>,
    json: bool,
) -> Result<()> {
    let scheme = scheme.unwrap_or_else(|| config.signature_verifier().signature_scheme());
    let var = &config.schema.webhook.secret_env;
    let secret = std::env::var(var)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::secret_not_configured(var))?;

    let body = read_body(body)?;
    let timer = Timer::start("webhook.sign");
    let header = scheme.sign(secret.as_bytes(), &body);
    timer.stop();
    metrics().increment("webhook.signed");

    if json {
        println!(
            "{}",
            serde_json::json!({
                "header": scheme.header_name(),
                "signature": header,
                "body_len": body.len(),
            })
        );
    } else {
        println!("{}", header);
    }
    Ok(())
}

/// Verify a signature header, failing with a security exit code on rejection
pub fn verify(
    config: &Config,
    body: Option<&Path>,
    signature: Option<&str>,
    scheme: Option<SignatureScheme>,
    json: bool,
) -> Result<()> {
    let mut verifier = config.signature_verifier();
    if let Some(scheme) = scheme {
        verifier = verifier.scheme(scheme);
    }

    let body = read_body(body)?;
    let timer = Timer::start("webhook.verify");
    let outcome = verifier.authorize(&body, signature);
    let elapsed = timer.stop();

    match outcome {
        Ok(()) => {
            metrics().increment("webhook.verified");
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": true,
                        "scheme": verifier.signature_scheme().to_string(),
                        "body_len": body.len(),
                    })
                );
            } else {
                Status::success(&format!(
                    "Signature valid ({} bytes, {})",
                    body.len(),
                    format_duration(elapsed)
                ));
            }
            Ok(())
        }
        Err(rejection) => {
            metrics().increment(&format!("webhook.rejected.{}", rejection.reason()));
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "reason": rejection.reason(),
                        "status": rejection.status_code(),
                    })
                );
            }
            Err(rejection_error(&rejection, &config.schema.webhook.secret_env))
        }
    }
}

/// Validate a subscription handshake and print the challenge to echo
pub fn handshake(
    config: &Config,
    mode: String,
    token: Option<String>,
    challenge: Option<String>,
    json: bool,
) -> Result<()> {
    let request = SubscriptionRequest {
        mode: Some(mode),
        verify_token: token,
        challenge,
    };

    match verify_subscription(&request, config.verify_token().as_deref()) {
        Ok(challenge) => {
            metrics().increment("webhook.subscription.verified");
            if json {
                println!("{}", serde_json::json!({ "status": 200, "challenge": challenge }));
            } else {
                println!("{}", challenge);
            }
            Ok(())
        }
        Err(e) => {
            metrics().increment("webhook.subscription.rejected");
            let rejection = Rejection::from(e);
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": rejection.status_code(),
                        "reason": rejection.reason(),
                    })
                );
            }
            Err(rejection_error(&rejection, &config.schema.webhook.verify_token_env))
        }
    }
}

fn rejection_error(rejection: &Rejection, secret_var: &str) -> Error {
    let not_configured = matches!(
        rejection,
        Rejection::Signature(VerificationFailure::SecretNotConfigured)
            | Rejection::Subscription(SubscriptionError::TokenNotConfigured)
    );

    if not_configured {
        return Error::secret_not_configured(secret_var)
            .with_context(format!("Would respond HTTP {}", rejection.status_code()));
    }

    Error::new(ErrorCode::SignatureRejected, rejection.to_string())
        .with_context(format!("Would respond HTTP {}", rejection.status_code()))
}
