//! Fixed window attempt limiting per device key.

mod rate_limit;

pub use rate_limit::{
    RateLimitConfig, RateLimiter, DEFAULT_MAX_ATTEMPTS, DEFAULT_SERVING_MAX_ATTEMPTS,
    DEFAULT_WINDOW_SECONDS,
};
