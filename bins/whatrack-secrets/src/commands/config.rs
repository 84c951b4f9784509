//! Configuration inspection

use whatrack_cli::output::{secret_state, Status};
use whatrack_core::config::Config;
use whatrack_core::error::Result;

/// Show the configuration in effect and whether each secret is usable
pub fn show(config: &Config, json: bool) -> Result<()> {
    let webhook = &config.schema.webhook;
    let tokens = &config.schema.tokens;

    let secret_set = std::env::var(&webhook.secret_env).is_ok_and(|s| !s.is_empty());
    let verify_token_set = config.verify_token().is_some();
    let key_usable = config.token_vault().is_available();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": config.path,
                "schema": config.schema,
                "webhook_secret_set": secret_set,
                "verify_token_set": verify_token_set,
                "token_key_usable": key_usable,
            })
        );
        return Ok(());
    }

    Status::header("Whatrack secrets configuration");
    Status::field("Config file", config.path.as_deref().unwrap_or("(defaults)"));
    Status::field("Signature header", &webhook.signature_header);
    Status::field("Webhook secret", &secret_state(&webhook.secret_env, secret_set));
    Status::field("Verify token", &secret_state(&webhook.verify_token_env, verify_token_set));
    Status::field("Token key", &secret_state(&tokens.key_env, key_usable));
    println!();

    if !secret_set {
        Status::warning("Webhook deliveries will be rejected until the app secret is set");
    }
    if !key_usable {
        Status::warning(&format!(
            "Token encryption unavailable: {} must be 64 hex characters",
            tokens.key_env
        ));
    }
    if secret_set && key_usable {
        Status::success("All secrets configured");
    }
    Ok(())
}
