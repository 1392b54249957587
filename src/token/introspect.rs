//! Unverified token inspection for diagnostics.
//!
//! Nothing here checks a signature or an expiry. This module exists so
//! log lines and support tooling can name the device and lifetime a
//! token *claims* to carry; it is deliberately not re-exported next to
//! the verification API, and the gateway never calls it. Using it to
//! make an authorization decision is a bug.

use base64::prelude::*;
use tracing::trace;

use super::payload::{TokenPayload, SEGMENT_SEPARATOR, TOKEN_PREFIX};

/// Decode a token's claimed payload without verifying anything.
///
/// Returns `None` when the wire format or the payload cannot be parsed.
/// A `Some` return says nothing about authenticity: the signature may be
/// garbage and the token may be long expired.
pub fn peek_unverified(token: &str) -> Option<TokenPayload> {
    let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
    if segments.len() != 3 || segments[0] != TOKEN_PREFIX {
        return None;
    }

    let payload_bytes = BASE64_STANDARD.decode(segments[1].as_bytes()).ok()?;
    let payload: TokenPayload = serde_json::from_slice(&payload_bytes).ok()?;

    trace!(device_id = %payload.device_id, "Peeked unverified token payload");
    Some(payload)
}
