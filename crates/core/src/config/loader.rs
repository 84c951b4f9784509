//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result};
use std::path::Path;
use whatrack_crypto::{SignatureScheme, SignatureVerifier, TokenVault};

/// Loaded configuration and where it came from
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings were read from, `None` for built-in defaults
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from a file path or use defaults
    ///
    /// An explicit path that does not exist is an error; when no path is
    /// given and no standard file is found, defaults are used.
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            if !Path::new(p).exists() {
                return Err(Error::config_not_found(p));
            }
        }

        let config_path = path.map(String::from).or_else(find_config_file);

        let schema = if let Some(ref p) = config_path {
            load_config_file(p)?
        } else {
            ConfigSchema::default()
        };
        validate(&schema).map_err(|e| match &config_path {
            Some(p) => e.with_context(format!("While validating {}", p)),
            None => e,
        })?;

        tracing::debug!(path = ?config_path, "Configuration loaded");

        Ok(Self {
            schema,
            path: config_path,
        })
    }

    /// Verifier reading the configured secret variable on every call
    ///
    /// [`Config::load`] rejects unknown header names. A schema built in code
    /// with an unknown name falls back to SHA-256 and logs a warning.
    pub fn signature_verifier(&self) -> SignatureVerifier {
        let header = &self.schema.webhook.signature_header;
        let scheme = SignatureScheme::from_header_name(header).unwrap_or_else(|| {
            tracing::warn!(header = %header, "Unknown signature header, using sha256");
            SignatureScheme::Sha256
        });
        SignatureVerifier::from_env_var(&self.schema.webhook.secret_env).scheme(scheme)
    }

    /// Vault reading the configured key variable on every call
    pub fn token_vault(&self) -> TokenVault {
        TokenVault::from_env_var(&self.schema.tokens.key_env)
    }

    /// Current subscription verify token, if set and non-empty
    pub fn verify_token(&self) -> Option<String> {
        std::env::var(&self.schema.webhook.verify_token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<String> {
    let candidates = [".whatrack.toml", "whatrack.toml", ".config/whatrack.toml"];

    for candidate in candidates {
        if Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
    }

    None
}

/// Reject settings that would silently change behaviour
fn validate(schema: &ConfigSchema) -> Result<()> {
    let header = &schema.webhook.signature_header;
    if SignatureScheme::from_header_name(header).is_none() {
        return Err(Error::config(format!("Unknown signature header: {}", header))
            .with_suggestion(format!(
                "Use {} or {}",
                SignatureScheme::Sha256.header_name(),
                SignatureScheme::Sha1.header_name()
            )));
    }
    Ok(())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &str) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config file {}: {}", path, e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::from(e).with_context(format!("While parsing {}", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.webhook.secret_env, "META_APP_SECRET");
        assert_eq!(config.schema.tokens.key_env, "TOKEN_ENCRYPTION_KEY");
        assert_eq!(config.schema.logging.level, "info");
    }

    #[test]
    fn test_config_explicit_missing_file() {
        let err = Config::load(Some("/nonexistent/whatrack.toml")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[webhook]\nsecret_env = \"WA_APP_SECRET\"\nsignature_header = \"X-Hub-Signature\"\n\n[tokens]\nkey_env = \"WA_TOKEN_KEY\""
        )
        .unwrap();

        let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.schema.webhook.secret_env, "WA_APP_SECRET");
        assert_eq!(config.schema.tokens.key_env, "WA_TOKEN_KEY");
        assert_eq!(config.schema.webhook.verify_token_env, "META_WEBHOOK_VERIFY_TOKEN");
        assert_eq!(
            config.signature_verifier().signature_scheme(),
            SignatureScheme::Sha1
        );
    }

    #[test]
    fn test_config_unknown_signature_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[webhook]\nsignature_header = \"X-Hub-Signature-1\"").unwrap();

        let err = Config::load(Some(file.path().to_str().unwrap())).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
        assert!(err.message.contains("X-Hub-Signature-1"));
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_config_header_name_case_insensitive() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[webhook]\nsignature_header = \"x-hub-signature-256\"").unwrap();

        let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(
            config.signature_verifier().signature_scheme(),
            SignatureScheme::Sha256
        );
    }

    #[test]
    fn test_config_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[webhook\nsecret_env = ").unwrap();

        let err = Config::load(Some(file.path().to_str().unwrap())).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
        assert!(err.context.is_some());
    }

    #[test]
    fn test_verifier_reads_configured_variable() {
        let mut config = Config::default();
        config.schema.webhook.secret_env = "WHATRACK_TEST_CONFIG_SECRET".to_string();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("WHATRACK_TEST_CONFIG_SECRET", "shh") };

        let body = br#"{"a":1}"#;
        let header = whatrack_crypto::sign_payload(b"shh", body);
        assert!(config.signature_verifier().verify(body, Some(&header)));
        unsafe { std::env::remove_var("WHATRACK_TEST_CONFIG_SECRET") };
    }

    #[test]
    fn test_verify_token_empty_is_none() {
        let mut config = Config::default();
        config.schema.webhook.verify_token_env = "WHATRACK_TEST_VERIFY_TOKEN_EMPTY".to_string();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("WHATRACK_TEST_VERIFY_TOKEN_EMPTY", "") };
        assert!(config.verify_token().is_none());
        unsafe { std::env::remove_var("WHATRACK_TEST_VERIFY_TOKEN_EMPTY") };
    }
}
