//! Framegate Library
//!
//! This crate provides the core authorization machinery for device-bound
//! screenshot delivery. Devices present HMAC-signed access tokens; the
//! gateway rate-limits validation attempts per device key and verifies
//! tokens into an admit/deny decision. The crate performs no I/O of its
//! own beyond loading configuration and the shared secret; serving
//! requests over HTTP is the embedding application's job.

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use config::Settings;
pub use error::{GateError, GateResult, TokenErrorKind};
pub use gateway::{AuthDecision, AuthGateway, DenyReason};
pub use limiter::{RateLimitConfig, RateLimiter};
pub use token::{TokenCodec, TokenPayload, ValidationResult};
