//! Shared building blocks for the visit counter crates.
//!
//! - `types`: JSON bodies exchanged with browser clients
//! - `utils::logging`: tracing subscriber setup
//! - `env`: startup directory checks

pub mod types;
pub mod utils;
pub mod env;
