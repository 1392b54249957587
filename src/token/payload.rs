//! Signed token payload and wire-format constants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed literal prefix of every token.
pub const TOKEN_PREFIX: &str = "token";

/// Separator between the prefix, payload, and signature segments.
///
/// The payload segment is standard base64 and the signature segment is
/// lowercase hex; neither alphabet contains `_`, so splitting on it is
/// unambiguous.
pub const SEGMENT_SEPARATOR: char = '_';

/// The claims carried inside a token.
///
/// Wire form is three `_`-separated segments:
/// `token_<base64(payload_json)>_<hex(hmac_sha256(secret, base64_segment))>`.
/// The signature covers the exact bytes of the base64 segment, so
/// serialization field order never affects verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Opaque device identifier the token is bound to.
    pub device_id: String,

    /// Creation time (RFC3339).
    pub issued_at: DateTime<Utc>,

    /// Absolute expiry (RFC3339). Tokens are invalid at or after this
    /// instant.
    pub expires_at: DateTime<Utc>,
}

impl TokenPayload {
    /// Create a payload for a device with explicit timestamps.
    pub fn new(
        device_id: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            issued_at,
            expires_at,
        }
    }
}
