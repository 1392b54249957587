//! Authorization decisions composed from the limiter and the codec.
//!
//! The gateway owns the ordering: the rate limiter is consulted before
//! any cryptographic work, so a flood of junk tokens for one device key
//! costs a map lookup per attempt, not an HMAC computation.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{GateError, GateResult};
use crate::limiter::RateLimiter;
use crate::token::TokenCodec;

/// Why a request was denied.
///
/// Malformed, forged, expired, and mis-bound tokens all collapse into
/// [`DenyReason::InvalidToken`]; distinguishing them in a response would
/// tell an attacker which hurdle they cleared. Rate limiting is surfaced
/// separately so the caller can answer with a retry-after hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The device key exhausted its attempt budget.
    RateLimited,
    /// The token failed verification, for any reason.
    InvalidToken,
}

impl DenyReason {
    /// Stable machine-readable reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::RateLimited => "rate_limited",
            DenyReason::InvalidToken => "invalid_token",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// The token verified; serve the request. When `rotate_recommended`
    /// is set the caller should hand the device a fresh token alongside
    /// the response.
    Admit { rotate_recommended: bool },
    /// The request must be refused.
    Deny { reason: DenyReason },
}

impl AuthDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AuthDecision::Admit { .. })
    }
}

/// Composes the rate limiter and token codec into a single decision point.
///
/// Holds one codec (one secret) and one validation limiter for its
/// lifetime. Decisions are side-effect-free apart from the limiter's
/// attempt bookkeeping.
pub struct AuthGateway {
    codec: TokenCodec,
    limiter: Arc<RateLimiter>,
}

impl AuthGateway {
    /// Create a gateway from an already-configured codec and limiter.
    pub fn new(codec: TokenCodec, limiter: Arc<RateLimiter>) -> Self {
        Self { codec, limiter }
    }

    /// Build a gateway from settings: loads the secret file, configures
    /// the codec lifetimes, and constructs the validation limiter.
    pub fn from_settings(settings: &Settings) -> GateResult<Self> {
        let secret = TokenCodec::load_secret(&settings.security.secret_path)?;
        let ttl = chrono::Duration::try_hours(settings.security.token_ttl_hours).ok_or_else(
            || GateError::Config {
                message: format!(
                    "token_ttl_hours {} is out of range",
                    settings.security.token_ttl_hours
                ),
            },
        )?;
        let threshold = chrono::Duration::try_hours(settings.security.rotation_threshold_hours)
            .ok_or_else(|| GateError::Config {
                message: format!(
                    "rotation_threshold_hours {} is out of range",
                    settings.security.rotation_threshold_hours
                ),
            })?;
        let codec = TokenCodec::new(&secret)
            .with_token_ttl(ttl)
            .with_rotation_threshold(threshold);
        let limiter = Arc::new(RateLimiter::new(settings.rate_limit.validation.to_config()));

        Ok(Self::new(codec, limiter))
    }

    /// The codec this gateway verifies with. Callers use it to issue
    /// tokens under the same secret and lifetimes.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// The validation limiter. Callers use it to start the periodic
    /// sweep or to reset a key administratively.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Decide whether a request bearing `token` for `device_id` may
    /// proceed.
    ///
    /// The limiter is consulted first and every call burns an attempt,
    /// whatever the token looks like. Only then is the token verified.
    pub fn authorize(&self, token: &str, device_id: &str) -> AuthDecision {
        let decision_id = Uuid::new_v4();

        debug!(
            decision_id = %decision_id,
            device_id,
            "Authorization requested"
        );

        if !self.limiter.is_allowed(device_id) {
            warn!(
                decision_id = %decision_id,
                device_id,
                "Rate limit exceeded"
            );
            return AuthDecision::Deny {
                reason: DenyReason::RateLimited,
            };
        }

        match self.codec.decode_and_verify(token, device_id) {
            Some(result) => {
                let rotate_recommended = self.codec.should_rotate(Some(&result));
                info!(
                    decision_id = %decision_id,
                    device_id,
                    age_seconds = result.age_seconds,
                    rotate_recommended,
                    "Token admitted"
                );
                AuthDecision::Admit { rotate_recommended }
            }
            None => {
                info!(
                    decision_id = %decision_id,
                    device_id,
                    "Token rejected"
                );
                AuthDecision::Deny {
                    reason: DenyReason::InvalidToken,
                }
            }
        }
    }
}
