//! Token envelope commands

use crate::commands::input::read_value;
use whatrack_cli::output::Status;
use whatrack_core::config::Config;
use whatrack_core::error::{Error, ResultExt, Result};
use whatrack_crypto::{generate_key_hex, looks_like_envelope, redact, TokenCipher};
use whatrack_telemetry::{metrics, Timer};

/// Print a freshly generated 64-hex-character key
pub fn keygen(config: &Config, json: bool) -> Result<()> {
    let key = generate_key_hex();
    metrics().increment("tokens.key_generated");

    if json {
        println!(
            "{}",
            serde_json::json!({ "env": config.schema.tokens.key_env, "key": key.as_str() })
        );
    } else {
        println!("{}", key.as_str());
    }
    Ok(())
}

/// Encrypt a token with the configured key
pub fn encrypt(config: &Config, token: Option<&str>, json: bool) -> Result<()> {
    let plaintext = read_value(token, "token")?;
    let vault = config.token_vault();

    let timer = Timer::start("tokens.encrypt");
    let envelope = vault
        .try_encrypt(&plaintext)
        .map_err(Error::from)
        .context(format!("Key variable: {}", config.schema.tokens.key_env))?;
    timer.stop();
    metrics().increment("tokens.encrypted");

    if json {
        println!("{}", serde_json::json!({ "envelope": envelope }));
    } else {
        println!("{}", envelope);
    }
    Ok(())
}

/// Decrypt an envelope with the configured key
pub fn decrypt(config: &Config, envelope: Option<&str>, json: bool) -> Result<()> {
    let envelope = read_value(envelope, "envelope")?;
    let vault = config.token_vault();

    let timer = Timer::start("tokens.decrypt");
    let result = vault.decrypt(&envelope);
    timer.stop();

    let token = result.map_err(|e| {
        metrics().increment("tokens.decrypt_failed");
        Error::from(e)
    })?;
    metrics().increment("tokens.decrypted");

    if json {
        println!("{}", serde_json::json!({ "token": token }));
    } else {
        println!("{}", token);
    }
    Ok(())
}

/// Recover a stored value, accepting rows written before encryption
pub fn resolve(config: &Config, stored: Option<&str>, masked: bool, json: bool) -> Result<()> {
    let stored = read_value(stored, "stored value")?;
    let source = if looks_like_envelope(&stored) { "envelope" } else { "legacy" };

    let token = config.token_vault().resolve(&stored)?;
    metrics().increment(&format!("tokens.resolved.{}", source));
    let shown = if masked { redact(&token) } else { token };

    if json {
        println!("{}", serde_json::json!({ "source": source, "token": shown }));
    } else {
        if source == "legacy" {
            Status::warning("Stored value is legacy plaintext; rotate it to encrypt");
        }
        println!("{}", shown);
    }
    Ok(())
}

/// Re-encrypt a stored value under the key held in `new_key_env`
pub fn rotate(config: &Config, stored: Option<&str>, new_key_env: &str, json: bool) -> Result<()> {
    let stored = read_value(stored, "stored value")?;

    let new_key = std::env::var(new_key_env)
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::secret_not_configured(new_key_env))?;
    let target = TokenCipher::from_hex(&new_key)
        .map_err(Error::from)
        .context(format!("Key variable: {}", new_key_env))?;

    let was_legacy = !looks_like_envelope(&stored);
    let rotated = config.token_vault().rotate(&stored, &target)?;
    metrics().increment("tokens.rotated");

    if json {
        println!(
            "{}",
            serde_json::json!({ "envelope": rotated, "was_legacy": was_legacy })
        );
    } else {
        println!("{}", rotated);
    }
    Ok(())
}
