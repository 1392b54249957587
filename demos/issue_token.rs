//! Issues a device token and walks it through the gateway.
//!
//! Run with `cargo run --example issue_token`. Set `RUST_LOG` to
//! override the configured log level.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use framegate::config::{LoggingConfig, RateLimitSettings};
use framegate::limiter::{RateLimitConfig, RateLimiter};
use framegate::token::TokenCodec;
use framegate::AuthGateway;

/// Initialize logging based on settings.
fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Default to pretty format
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[tokio::main]
async fn main() {
    // A deployment loads these from a TOML file via Settings::load; the
    // demo runs on the defaults.
    let logging = LoggingConfig {
        level: "debug".to_string(),
        ..LoggingConfig::default()
    };
    init_logging(&logging);

    // Inline secret for the demo. A deployment loads it from a
    // root-owned file via TokenCodec::load_secret.
    let codec = TokenCodec::new(b"0123456789abcdef0123456789abcdef");
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(3, 60)));

    // The sweep is caller-scheduled; start it on the configured cadence.
    let rate_limit = RateLimitSettings::default();
    limiter.start_sweep_task(Duration::from_secs(rate_limit.sweep_interval_seconds));

    let gateway = AuthGateway::new(codec, limiter);

    let device_id = "frame-lobby-01";
    let token = gateway.codec().issue(device_id).expect("Failed to issue token");
    info!(device_id, token_len = token.len(), "Issued token");

    let decision = gateway.authorize(&token, device_id);
    info!(?decision, "Genuine token, correct device");

    let decision = gateway.authorize(&token, "frame-den-02");
    info!(?decision, "Genuine token, wrong device");

    // Burn through the small demo budget.
    for attempt in 2..=4 {
        let decision = gateway.authorize(&token, device_id);
        info!(attempt, ?decision, "Repeat check");
    }
    info!(
        remaining = gateway.limiter().remaining_attempts(device_id),
        "Attempt budget spent"
    );
}
