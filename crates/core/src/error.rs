//! Structured errors for the secrets tooling
//!
//! Every failure carries:
//! - a stable [`ErrorCode`] whose thousands digit selects the process exit code
//! - optional context describing what was being attempted
//! - an optional hint telling the operator what to change
//!
//! Messages name environment variables, never their values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use whatrack_crypto::CryptoError;

/// Stable error codes, grouped by thousands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // IO (2xxx)
    /// Reading input failed
    IoError = 2000,
    /// Input file does not exist
    FileNotFound = 2001,
    /// Input file is not readable
    PermissionDenied = 2002,

    // Configuration (3xxx)
    /// Configuration file could not be read or is semantically invalid
    ConfigError = 3000,
    /// Explicitly requested configuration file does not exist
    ConfigNotFound = 3001,
    /// Configuration file is not valid TOML
    ConfigParseError = 3002,
    /// A required secret variable is unset or empty
    SecretNotConfigured = 3003,
    /// A key variable is set but is not 64 hex characters
    InvalidKey = 3004,

    // Validation (6xxx)
    /// Command input is missing or unusable
    ValidationError = 6000,
    /// Decrypted bytes are not valid text
    InvalidInput = 6001,
    /// Stored value is not a well-formed envelope
    InvalidFormat = 6002,

    // Security (7xxx)
    /// A webhook delivery or handshake would be refused
    SignatureRejected = 7001,
    /// An envelope failed its authentication tag check
    AuthenticationFailed = 7002,
}

impl ErrorCode {
    /// Numeric value of the code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Category shown in reports
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            2 => "IO",
            3 => "Configuration",
            6 => "Validation",
            7 => "Security",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Error returned by every command
#[derive(Error, Debug)]
pub struct Error {
    /// Stable code
    pub code: ErrorCode,
    /// What went wrong
    pub message: String,
    /// What was being attempted
    pub context: Option<String>,
    /// What the operator should change
    pub suggestion: Option<String>,
    /// Underlying cause
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create an error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Attach what was being attempted
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a hint for the operator
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Serializable form for `--format json`
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.code.code() / 1000 {
            3 => exit_codes::CONFIG_ERROR,
            6 => exit_codes::VALIDATION_ERROR,
            7 => exit_codes::SECURITY_ERROR,
            _ => exit_codes::FAILURE,
        }
    }

    /// Configuration that is present but unusable
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Explicit `--config` path that does not exist
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .whatrack.toml file or use --config to specify a path")
    }

    /// Secret variable that is unset or empty
    pub fn secret_not_configured(var: &str) -> Self {
        Self::new(ErrorCode::SecretNotConfigured, format!("{} is not set", var))
            .with_suggestion(format!("Export {} before running this command", var))
    }

    /// Command input that is missing or unusable
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }
}

/// JSON shape of an [`Error`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Stable code
    pub code: ErrorCode,
    /// Code rendered as `E0000`
    pub code_str: String,
    /// Category of the code
    pub category: String,
    /// What went wrong
    pub message: String,
    /// What was being attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// What the operator should change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Underlying cause, rendered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes
pub mod exit_codes {
    /// Command succeeded
    pub const SUCCESS: i32 = 0;
    /// IO or other failure
    pub const FAILURE: i32 = 1;
    /// Input was unusable
    pub const VALIDATION_ERROR: i32 = 2;
    /// Configuration or secret missing or invalid
    pub const CONFIG_ERROR: i32 = 3;
    /// Signature, handshake or envelope authentication refused
    pub const SECURITY_ERROR: i32 = 5;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        let (code, suggestion) = match &err {
            CryptoError::AuthenticationFailed => (
                ErrorCode::AuthenticationFailed,
                Some("The envelope was tampered with or encrypted under a different key"),
            ),
            CryptoError::InvalidKey(_) => (
                ErrorCode::InvalidKey,
                Some("Generate a key with `whatrack-secrets keygen`"),
            ),
            CryptoError::EncryptionUnavailable(_) => (
                ErrorCode::SecretNotConfigured,
                Some("Set TOKEN_ENCRYPTION_KEY to 64 hex characters"),
            ),
            CryptoError::MalformedEnvelope(_) => (ErrorCode::InvalidFormat, None),
            CryptoError::EncodingError(_) => (ErrorCode::InvalidInput, None),
        };

        let error = Error::new(code, err.to_string());
        let error = match suggestion {
            Some(s) => error.with_suggestion(s),
            None => error,
        };
        error.with_source(err)
    }
}

/// Attach context to a failed [`Result`]
pub trait ResultExt<T> {
    /// Record what was being attempted when the error occurred
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
