//! Configuration loading and schema definitions
//!
//! A TOML file chooses which environment variables hold the webhook secret
//! and the token key. Values are read from the environment at call time.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
