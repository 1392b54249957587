//! Configuration module for the token gateway.
//!
//! Handles loading and validating gateway configuration from TOML files.

mod settings;

pub use settings::*;
