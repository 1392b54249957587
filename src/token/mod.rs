//! Token wire format, signing, and verification.

mod codec;
pub mod introspect;
mod payload;

pub use codec::{
    TokenCodec, ValidationResult, DEFAULT_ROTATION_THRESHOLD_HOURS, DEFAULT_TOKEN_TTL_HOURS,
    MIN_RECOMMENDED_SECRET_LEN,
};
pub use payload::{TokenPayload, SEGMENT_SEPARATOR, TOKEN_PREFIX};
