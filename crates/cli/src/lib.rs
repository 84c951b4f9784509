//! Terminal output helpers for Whatrack tools
//!
//! - Status lines (success, warning, headers, fields)
//! - Duration formatting
//! - Set/unset display of secret variables

#![warn(missing_docs)]

pub mod output;
