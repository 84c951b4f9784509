//! CLI command implementations

pub mod config;
pub mod input;
pub mod tokens;
pub mod webhook;
