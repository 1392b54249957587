//! HMAC-SHA256 token encoding and verification.

use std::path::Path;
use std::sync::Arc;

use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{GateError, GateResult, TokenErrorKind};

use super::payload::{TokenPayload, SEGMENT_SEPARATOR, TOKEN_PREFIX};

/// Default issuance lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Remaining lifetime below which re-issuance is recommended.
pub const DEFAULT_ROTATION_THRESHOLD_HOURS: i64 = 6;

/// Recommended minimum secret length for HMAC-SHA256.
pub const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// Outcome of a successful verification. Derived on every call, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Device the token is bound to.
    pub device_id: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// Seconds elapsed since issuance.
    pub age_seconds: i64,
}

/// Token encoder/verifier for one shared secret.
///
/// The secret is fixed at construction for the lifetime of the codec;
/// rotating it means building a new codec. A codec built with an empty
/// secret verifies nothing: every `decode_and_verify` call fails closed.
pub struct TokenCodec {
    key: hmac::Key,
    key_empty: bool,
    token_ttl: Duration,
    rotation_threshold: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec with default TTL (24 h) and rotation threshold (6 h).
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            key_empty: secret.is_empty(),
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            rotation_threshold: Duration::hours(DEFAULT_ROTATION_THRESHOLD_HOURS),
            clock: Arc::new(SystemClock),
        }
    }

    /// Override the issuance lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Override the rotation threshold.
    pub fn with_rotation_threshold(mut self, threshold: Duration) -> Self {
        self.rotation_threshold = threshold;
        self
    }

    /// Override the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Load the shared secret from a file.
    ///
    /// Security: Verifies the file has restrictive permissions (0600 or
    /// 0400) before loading to prevent the secret from being readable by
    /// other users. Rejects empty files; warns when the secret is shorter
    /// than the recommended 32 bytes.
    pub fn load_secret(path: &Path) -> GateResult<Vec<u8>> {
        let metadata = std::fs::metadata(path).map_err(|e| GateError::Secret {
            message: format!(
                "Failed to read secret metadata from {}: {}",
                path.display(),
                e
            ),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            // Check that group and world bits are all zero (only owner can access)
            if mode & 0o077 != 0 {
                return Err(GateError::Secret {
                    message: format!(
                        "Secret file {} has insecure permissions {:04o}, expected 0600 or 0400",
                        path.display(),
                        mode & 0o777
                    ),
                });
            }
        }

        let secret = std::fs::read(path).map_err(|e| GateError::Secret {
            message: format!("Failed to read secret from {}: {}", path.display(), e),
        })?;

        if secret.is_empty() {
            return Err(GateError::Secret {
                message: format!("Secret file {} is empty", path.display()),
            });
        }

        if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            warn!(
                path = %path.display(),
                len = secret.len(),
                "Secret is shorter than the recommended {} bytes",
                MIN_RECOMMENDED_SECRET_LEN
            );
        }

        Ok(secret)
    }

    /// Serialize and sign a payload into its wire form.
    ///
    /// The signature covers the exact bytes of the base64 payload
    /// segment, so a verifier never re-serializes the payload to check it.
    pub fn encode(&self, payload: &TokenPayload) -> GateResult<String> {
        if self.key_empty {
            return Err(GateError::Token {
                kind: TokenErrorKind::EmptyInput,
            });
        }
        if payload.device_id.is_empty() {
            return Err(GateError::Token {
                kind: TokenErrorKind::MissingField { field: "device_id" },
            });
        }

        let payload_json = serde_json::to_vec(payload)?;
        let payload_segment = BASE64_STANDARD.encode(payload_json);
        let tag = hmac::sign(&self.key, payload_segment.as_bytes());
        let signature = hex::encode(tag.as_ref());

        Ok(format!(
            "{}_{}_{}",
            TOKEN_PREFIX, payload_segment, signature
        ))
    }

    /// Issue a fresh token for a device using the configured TTL.
    pub fn issue(&self, device_id: &str) -> GateResult<String> {
        let now = self.clock.now();
        let payload = TokenPayload::new(device_id, now, now + self.token_ttl);
        self.encode(&payload)
    }

    /// Parse and cryptographically verify a token for the given device.
    ///
    /// Returns `None` on any doubt: malformed input, wrong device, bad
    /// signature, or expiry. Rejections are logged with a reason; the raw
    /// token and the secret are never logged. Never panics on
    /// attacker-controlled input.
    pub fn decode_and_verify(
        &self,
        token: &str,
        expected_device_id: &str,
    ) -> Option<ValidationResult> {
        match self.try_decode_and_verify(token, expected_device_id) {
            Ok(result) => {
                debug!(
                    device_id = %result.device_id,
                    age_seconds = result.age_seconds,
                    "Token verified"
                );
                Some(result)
            }
            Err(kind) => {
                debug!(
                    device_id = %expected_device_id,
                    token_len = token.len(),
                    reason = %kind,
                    "Token rejected"
                );
                None
            }
        }
    }

    /// Validation pipeline, short-circuiting on the first failure.
    fn try_decode_and_verify(
        &self,
        token: &str,
        expected_device_id: &str,
    ) -> Result<ValidationResult, TokenErrorKind> {
        // 1. Non-empty inputs. An empty secret is a guaranteed deny, not
        //    a configuration panic.
        if token.is_empty() || expected_device_id.is_empty() || self.key_empty {
            return Err(TokenErrorKind::EmptyInput);
        }

        // 2. Exactly three segments with the fixed prefix.
        let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
        if segments.len() != 3 || segments[0] != TOKEN_PREFIX {
            return Err(TokenErrorKind::InvalidFormat);
        }
        let payload_segment = segments[1];
        let signature_segment = segments[2];

        // 3. Decode the payload before any signature work. Partial or
        //    malformed structures are rejected outright.
        let payload_bytes = BASE64_STANDARD
            .decode(payload_segment.as_bytes())
            .map_err(|_| TokenErrorKind::PayloadDecode)?;
        let payload: TokenPayload =
            serde_json::from_slice(&payload_bytes).map_err(|_| TokenErrorKind::PayloadDecode)?;

        // 4. Device binding: a token for device A presented with device
        //    B's identifier always fails.
        if payload.device_id != expected_device_id {
            return Err(TokenErrorKind::DeviceMismatch);
        }

        // 5. Constant-time signature check over the exact base64 segment
        //    bytes. ring::hmac::verify never short-circuits on a byte
        //    mismatch.
        let signature_bytes =
            hex::decode(signature_segment).map_err(|_| TokenErrorKind::SignatureInvalid)?;
        hmac::verify(&self.key, payload_segment.as_bytes(), &signature_bytes)
            .map_err(|_| TokenErrorKind::SignatureInvalid)?;

        // 6. Expiry: invalid at or after expires_at.
        let now = self.clock.now();
        if now >= payload.expires_at {
            return Err(TokenErrorKind::Expired {
                age_past_expiry_seconds: now
                    .signed_duration_since(payload.expires_at)
                    .num_seconds(),
            });
        }

        // 7. Success.
        let age_seconds = now.signed_duration_since(payload.issued_at).num_seconds();
        Ok(ValidationResult {
            device_id: payload.device_id,
            issued_at: payload.issued_at,
            expires_at: payload.expires_at,
            age_seconds,
        })
    }

    /// Whether the caller should mint a fresh token.
    ///
    /// True when validation failed (forces re-issuance) or when the
    /// remaining lifetime is below the rotation threshold, so fleets
    /// re-issue gradually instead of stampeding at hard expiry.
    pub fn should_rotate(&self, result: Option<&ValidationResult>) -> bool {
        match result {
            None => true,
            Some(r) => {
                r.expires_at.signed_duration_since(self.clock.now()) < self.rotation_threshold
            }
        }
    }
}
