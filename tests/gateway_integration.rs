//! Integration tests for the token gateway.
//!
//! These tests build a real gateway from on-disk configuration (TOML
//! settings plus a secret file) and drive the full authorization flow
//! through the public API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use framegate::config::Settings;
use framegate::gateway::{AuthDecision, AuthGateway, DenyReason};
use framegate::limiter::{RateLimitConfig, RateLimiter};
use framegate::token::{TokenCodec, TokenPayload};

const SECRET: &str = "0123456789abcdef0123456789abcdef";

/// Gateway built from files on disk, the way an embedding service
/// would construct it.
struct TestGateway {
    gateway: AuthGateway,
    config_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestGateway {
    /// Write a secret file and a config file, then build the gateway
    /// through `Settings::load` and `AuthGateway::from_settings`.
    fn start(max_attempts: u32, window_seconds: u64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let secret_path = temp_dir.path().join("secret.key");
        std::fs::write(&secret_path, SECRET).expect("Failed to write secret");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))
                .expect("Failed to set secret permissions");
        }

        let config_path = temp_dir.path().join("config.toml");
        let config = format!(
            r#"
[security]
secret_path = "{}"

[rate_limit.validation]
max_attempts = {}
window_seconds = {}
"#,
            secret_path.display(),
            max_attempts,
            window_seconds,
        );
        std::fs::write(&config_path, config).expect("Failed to write config");

        let settings = Settings::load(&config_path).expect("Failed to load settings");
        let gateway = AuthGateway::from_settings(&settings).expect("Failed to build gateway");

        Self {
            gateway,
            config_path,
            _temp_dir: temp_dir,
        }
    }
}

// ============================================================================
// Authorization Flow Tests
// ============================================================================

#[test]
fn test_issue_then_authorize() {
    let tg = TestGateway::start(10, 60);

    let token = tg.gateway.codec().issue("dev_1").expect("Failed to issue");
    assert_eq!(
        tg.gateway.authorize(&token, "dev_1"),
        AuthDecision::Admit {
            rotate_recommended: false
        }
    );
}

#[test]
fn test_near_expiry_token_gets_rotation_hint() {
    let tg = TestGateway::start(10, 60);

    // 3h of a 24h lifetime remaining, under the default 6h threshold.
    let now = Utc::now();
    let token = tg
        .gateway
        .codec()
        .encode(&TokenPayload::new(
            "dev_1",
            now - chrono::Duration::hours(21),
            now + chrono::Duration::hours(3),
        ))
        .expect("Failed to encode");

    assert_eq!(
        tg.gateway.authorize(&token, "dev_1"),
        AuthDecision::Admit {
            rotate_recommended: true
        }
    );
}

#[test]
fn test_token_bound_to_its_device() {
    let tg = TestGateway::start(10, 60);

    let token = tg.gateway.codec().issue("dev_1").expect("Failed to issue");
    assert_eq!(
        tg.gateway.authorize(&token, "dev_2"),
        AuthDecision::Deny {
            reason: DenyReason::InvalidToken
        }
    );
}

#[test]
fn test_expired_token_rejected() {
    let tg = TestGateway::start(10, 60);

    let now = Utc::now();
    let token = tg
        .gateway
        .codec()
        .encode(&TokenPayload::new(
            "dev_1",
            now - chrono::Duration::hours(25),
            now - chrono::Duration::hours(1),
        ))
        .expect("Failed to encode");

    assert_eq!(
        tg.gateway.authorize(&token, "dev_1"),
        AuthDecision::Deny {
            reason: DenyReason::InvalidToken
        }
    );
}

#[test]
fn test_tampered_token_rejected() {
    let tg = TestGateway::start(10, 60);

    let token = tg.gateway.codec().issue("dev_1").expect("Failed to issue");
    let mut bytes = token.clone().into_bytes();
    let last = bytes.len() - 1;
    bytes[last] = if bytes[last] == b'0' { b'1' } else { b'0' };
    let tampered = String::from_utf8(bytes).expect("Failed to rebuild token");

    assert_eq!(
        tg.gateway.authorize(&tampered, "dev_1"),
        AuthDecision::Deny {
            reason: DenyReason::InvalidToken
        }
    );
}

// ============================================================================
// Rate Limiting Tests
// ============================================================================

#[test]
fn test_attempt_budget_exhaustion() {
    let tg = TestGateway::start(5, 60);
    let token = tg.gateway.codec().issue("dev_1").expect("Failed to issue");

    for _ in 0..5 {
        assert!(tg.gateway.authorize(&token, "dev_1").is_admitted());
    }

    assert_eq!(
        tg.gateway.authorize(&token, "dev_1"),
        AuthDecision::Deny {
            reason: DenyReason::RateLimited
        }
    );

    // Unrelated devices keep their own budget.
    let other = tg.gateway.codec().issue("dev_2").expect("Failed to issue");
    assert!(tg.gateway.authorize(&other, "dev_2").is_admitted());
}

#[test]
fn test_budget_recovers_after_window() {
    let tg = TestGateway::start(2, 1);
    let token = tg.gateway.codec().issue("dev_1").expect("Failed to issue");

    assert!(tg.gateway.authorize(&token, "dev_1").is_admitted());
    assert!(tg.gateway.authorize(&token, "dev_1").is_admitted());
    assert!(!tg.gateway.authorize(&token, "dev_1").is_admitted());

    // Wait for the window to elapse.
    std::thread::sleep(Duration::from_secs(2));

    assert!(tg.gateway.authorize(&token, "dev_1").is_admitted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_sweep_task() {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(10, 1)));
    limiter.start_sweep_task(Duration::from_millis(50));

    assert!(limiter.is_allowed("dev_1"));
    assert_eq!(limiter.tracked_keys(), 1);

    // Stale after 2x the 1s window; give the sweeper time to run.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(limiter.tracked_keys(), 0);
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_settings_round_trip_from_disk() {
    let tg = TestGateway::start(5, 60);

    let settings = Settings::load(&tg.config_path).expect("Failed to reload settings");
    assert_eq!(settings.rate_limit.validation.max_attempts, 5);
    // Sections absent from the file fall back to defaults.
    assert_eq!(settings.rate_limit.serving.max_attempts, 60);
    assert_eq!(settings.security.token_ttl_hours, 24);
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");

    std::fs::write(
        &config_path,
        "[security]\nsecret_path = \"/nonexistent\"\n\n[logging]\nlevel = \"verbose\"\n",
    )
    .expect("Failed to write config");

    assert!(Settings::load(&config_path).is_err());
}

#[cfg(unix)]
#[test]
fn test_world_readable_secret_rejected() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let secret_path = temp_dir.path().join("secret.key");
    std::fs::write(&secret_path, SECRET).expect("Failed to write secret");
    std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o644))
        .expect("Failed to set secret permissions");

    assert!(TokenCodec::load_secret(&secret_path).is_err());
}

#[test]
fn test_empty_secret_file_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let secret_path = temp_dir.path().join("secret.key");
    std::fs::write(&secret_path, b"").expect("Failed to write secret");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))
            .expect("Failed to set secret permissions");
    }

    assert!(TokenCodec::load_secret(&secret_path).is_err());
}
