//! Core utilities for Whatrack secrets tooling
//!
//! This crate provides shared functionality used by the binaries:
//!
//! - **Error handling**: Structured errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML file naming the environment variables that hold secrets
//!
//! # Example
//!
//! ```rust,no_run
//! use whatrack_core::config::Config;
//!
//! let config = Config::load(None).expect("valid configuration");
//! let verifier = config.signature_verifier();
//!
//! if !verifier.verify(b"{}", Some("sha256=00")) {
//!     eprintln!("Rejected");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use error::{Error, ErrorCode, Result, ResultExt};
