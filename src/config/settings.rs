//! Configuration settings for the token gateway.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::GateError;
use crate::limiter::RateLimitConfig;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub security: SecurityConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Path to the HMAC secret file.
    pub secret_path: PathBuf,
    /// Token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Remaining lifetime in hours below which rotation is recommended.
    #[serde(default = "default_rotation_threshold_hours")]
    pub rotation_threshold_hours: i64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Limits for token validation attempts.
    #[serde(default = "default_validation_limits")]
    pub validation: LimiterSettings,
    /// Limits for the image-serving endpoint.
    #[serde(default = "default_serving_limits")]
    pub serving: LimiterSettings,
    /// Interval between sweeps of stale limiter entries, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

/// Limits for one limiter instance.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimiterSettings {
    /// Maximum attempts allowed per window.
    pub max_attempts: u32,
    /// Window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

impl LimiterSettings {
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_attempts, self.window_seconds)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_token_ttl_hours() -> i64 {
    crate::token::DEFAULT_TOKEN_TTL_HOURS
}

fn default_rotation_threshold_hours() -> i64 {
    crate::token::DEFAULT_ROTATION_THRESHOLD_HOURS
}

fn default_validation_limits() -> LimiterSettings {
    LimiterSettings {
        max_attempts: crate::limiter::DEFAULT_MAX_ATTEMPTS,
        window_seconds: default_window_seconds(),
    }
}

fn default_serving_limits() -> LimiterSettings {
    LimiterSettings {
        max_attempts: crate::limiter::DEFAULT_SERVING_MAX_ATTEMPTS,
        window_seconds: default_window_seconds(),
    }
}

fn default_window_seconds() -> u64 {
    crate::limiter::DEFAULT_WINDOW_SECONDS
}

fn default_sweep_interval() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            validation: default_validation_limits(),
            serving: default_serving_limits(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GateError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| GateError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), GateError> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        // One year cap keeps the chrono duration math in range.
        if !(1..=8760).contains(&self.security.token_ttl_hours) {
            return Err(GateError::Config {
                message: format!(
                    "Invalid token_ttl_hours {}. Must be between 1 and 8760",
                    self.security.token_ttl_hours
                ),
            });
        }

        if self.security.rotation_threshold_hours < 0
            || self.security.rotation_threshold_hours >= self.security.token_ttl_hours
        {
            return Err(GateError::Config {
                message: format!(
                    "Invalid rotation_threshold_hours {}. Must be in 0..token_ttl_hours ({})",
                    self.security.rotation_threshold_hours, self.security.token_ttl_hours
                ),
            });
        }

        for (name, limits) in [
            ("validation", &self.rate_limit.validation),
            ("serving", &self.rate_limit.serving),
        ] {
            if limits.max_attempts == 0 {
                return Err(GateError::Config {
                    message: format!("rate_limit.{} max_attempts must be at least 1", name),
                });
            }
            if limits.window_seconds == 0 {
                return Err(GateError::Config {
                    message: format!("rate_limit.{} window_seconds must be at least 1", name),
                });
            }
        }

        if self.rate_limit.sweep_interval_seconds == 0 {
            return Err(GateError::Config {
                message: "sweep_interval_seconds must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
