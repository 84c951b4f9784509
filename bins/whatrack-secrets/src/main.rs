//! whatrack-secrets - operator CLI for webhook signatures and stored tokens
//!
//! Signs and verifies Meta webhook payloads, answers subscription handshakes,
//! and manages the AES-256-GCM envelopes that protect third-party access
//! tokens at rest. Secrets are always read from the environment variables
//! named in `.whatrack.toml`, never from the command line.

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use whatrack_core::config::Config;
use whatrack_core::error::exit_codes;
use whatrack_telemetry::TelemetryConfig;

mod commands;

use commands::{config as config_cmd, tokens, webhook};

/// Webhook signature and token envelope tooling for Whatrack
#[derive(Parser)]
#[command(name = "whatrack-secrets")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "WHATRACK_CONFIG")]
    config: Option<String>,

    /// Print collected metrics to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scheme {
    Sha256,
    Sha1,
}

impl From<Scheme> for whatrack_crypto::SignatureScheme {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Sha256 => Self::Sha256,
            Scheme::Sha1 => Self::Sha1,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the signature header for a payload
    Sign {
        /// File with the raw body (stdin if omitted or `-`)
        body: Option<PathBuf>,

        /// Signature scheme
        #[arg(long, value_enum)]
        scheme: Option<Scheme>,
    },

    /// Verify a signature header against a raw payload
    Verify {
        /// File with the raw body (stdin if omitted or `-`)
        body: Option<PathBuf>,

        /// Signature header value, e.g. `sha256=...`
        #[arg(short, long)]
        signature: Option<String>,

        /// Signature scheme
        #[arg(long, value_enum)]
        scheme: Option<Scheme>,
    },

    /// Answer a webhook subscription handshake
    Handshake {
        /// hub.mode
        #[arg(long, default_value = "subscribe")]
        mode: String,

        /// hub.verify_token
        #[arg(long)]
        token: Option<String>,

        /// hub.challenge
        #[arg(long)]
        challenge: Option<String>,
    },

    /// Generate a new token encryption key
    Keygen,

    /// Encrypt an access token into an envelope
    Encrypt {
        /// Token (stdin if omitted or `-`)
        token: Option<String>,
    },

    /// Decrypt an envelope back into the access token
    Decrypt {
        /// Envelope (stdin if omitted or `-`)
        envelope: Option<String>,
    },

    /// Recover a stored value, passing legacy plaintext through
    Resolve {
        /// Stored value (stdin if omitted or `-`)
        stored: Option<String>,

        /// Show only a masked form of the token
        #[arg(long)]
        redact: bool,
    },

    /// Re-encrypt a stored value under a new key
    Rotate {
        /// Stored value (stdin if omitted or `-`)
        stored: Option<String>,

        /// Environment variable holding the new 64-hex-character key
        #[arg(long)]
        new_key_env: String,
    },

    /// Show which configuration and secrets are in effect
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let json = cli.format == "json";

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return exit_with(e.exit_code());
        }
    };

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.schema.logging.level.clone()
    };
    let telemetry = TelemetryConfig {
        json,
        ..TelemetryConfig::with_level(level)
    };
    if let Err(e) = whatrack_telemetry::init_with_config(telemetry) {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }

    let result = match cli.command {
        Commands::Sign { body, scheme } => {
            webhook::sign(&config, body.as_deref(), scheme.map(Into::into), json)
        }
        Commands::Verify { body, signature, scheme } => webhook::verify(
            &config,
            body.as_deref(),
            signature.as_deref(),
            scheme.map(Into::into),
            json,
        ),
        Commands::Handshake { mode, token, challenge } => {
            webhook::handshake(&config, mode, token, challenge, json)
        }
        Commands::Keygen => tokens::keygen(&config, json),
        Commands::Encrypt { token } => tokens::encrypt(&config, token.as_deref(), json),
        Commands::Decrypt { envelope } => tokens::decrypt(&config, envelope.as_deref(), json),
        Commands::Resolve { stored, redact } => {
            tokens::resolve(&config, stored.as_deref(), redact, json)
        }
        Commands::Rotate { stored, new_key_env } => {
            tokens::rotate(&config, stored.as_deref(), &new_key_env, json)
        }
        Commands::Config => config_cmd::show(&config, json),
    };

    if cli.metrics {
        eprintln!("{}", whatrack_telemetry::metrics().export_json());
    }

    match result {
        Ok(()) => exit_with(exit_codes::SUCCESS),
        Err(e) => {
            if json {
                let report = serde_json::to_string(&e.to_report()).unwrap_or_default();
                eprintln!("{}", report);
            } else {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
            exit_with(e.exit_code())
        }
    }
}

fn exit_with(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
