//! Error types for the framegate core.

use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Secret key loading errors.
    #[error("Secret error: {message}")]
    Secret { message: String },

    /// Token encoding/validation errors.
    #[error("Token error: {kind}")]
    Token { kind: TokenErrorKind },

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Token failure kinds.
///
/// The `Display` strings double as the structured `reason` field in
/// rejection log events. External callers only ever see the collapsed
/// `invalid_token` deny reason; these kinds exist for logs and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenErrorKind {
    #[error("empty input")]
    EmptyInput,

    #[error("invalid format")]
    InvalidFormat,

    #[error("payload decode failed")]
    PayloadDecode,

    #[error("device_id mismatch")]
    DeviceMismatch,

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("expired: {age_past_expiry_seconds}s past expiry")]
    Expired { age_past_expiry_seconds: i64 },

    #[error("missing payload field: {field}")]
    MissingField { field: &'static str },
}

/// Result type alias for framegate operations.
pub type GateResult<T> = Result<T, GateError>;
