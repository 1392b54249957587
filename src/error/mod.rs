//! Error types for the framegate core.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
