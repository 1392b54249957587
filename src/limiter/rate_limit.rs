//! Per-device-key rate limiting.
//!
//! Provides a fixed window rate limiter to prevent abuse by bounding
//! the number of attempts a single device key can make within a time
//! window. It applies before any token is inspected, so malformed and
//! forged tokens burn attempts just like valid ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Default attempt budget for token validation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
/// Default attempt budget for the coarser image-serving limiter.
pub const DEFAULT_SERVING_MAX_ATTEMPTS: u32 = 60;

/// Limits for one [`RateLimiter`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum attempts allowed per window
    pub max_attempts: u32,
    /// Length of the fixed window
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_attempts: u32, window_seconds: u64) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(window_seconds),
        }
    }
}

impl Default for RateLimitConfig {
    /// Validation-endpoint defaults. The image-serving endpoint uses a
    /// coarser instance configured separately.
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_SECONDS)
    }
}

/// Attempt bookkeeping for one device key.
#[derive(Debug, Clone, Copy)]
struct AttemptEntry {
    /// Attempts recorded in the current window
    count: u32,
    /// Instant the current window began
    window_start: DateTime<Utc>,
}

impl AttemptEntry {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

/// A fixed window rate limiter that tracks attempts per device key.
///
/// Each key can make at most `max_attempts` within `window`. The window
/// resets wholesale once it elapses rather than sliding, so a key can
/// burst up to `2 * max_attempts` across a window boundary; that
/// tradeoff keeps the bookkeeping to a single counter per key.
///
/// The limiter never fails: every operation reports allow or deny.
pub struct RateLimiter {
    /// Attempt counters per device key
    entries: Mutex<HashMap<String, AttemptEntry>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given limits.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock source. Intended for tests that need to step
    /// time deterministically.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record an attempt for the given key and check whether it is allowed.
    ///
    /// Returns `true` if the attempt is allowed, `false` if rate limited.
    /// Denied attempts still count, so a key that keeps hammering stays
    /// denied until its window elapses.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let entry = entries
            .entry(key.to_owned())
            .or_insert_with(|| AttemptEntry::fresh(now));

        if window_elapsed(entry.window_start, now, self.config.window) {
            *entry = AttemptEntry::fresh(now);
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.config.max_attempts
    }

    /// Attempts still available to the key in its current window.
    ///
    /// Returns the full budget when the key has no entry or its window
    /// has elapsed.
    pub fn remaining_attempts(&self, key: &str) -> u32 {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get(key) {
            Some(entry) if !window_elapsed(entry.window_start, now, self.config.window) => {
                self.config.max_attempts.saturating_sub(entry.count)
            }
            _ => self.config.max_attempts,
        }
    }

    /// Forget a key entirely. Administrative and test use.
    pub fn reset(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// Remove entries whose window started more than twice the window
    /// length ago.
    ///
    /// The limiter never schedules this itself; call it periodically to
    /// prevent unbounded memory growth, either directly or via
    /// [`RateLimiter::start_sweep_task`].
    pub fn sweep(&self) {
        let now = self.clock.now();
        let stale_after = self.config.window * 2;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let before = entries.len();
        entries.retain(|_, entry| !window_elapsed(entry.window_start, now, stale_after));

        let removed = before - entries.len();
        if removed > 0 {
            debug!(
                removed,
                remaining = entries.len(),
                "Swept stale rate limit entries"
            );
        }
    }

    /// Get the number of device keys being tracked.
    pub fn tracked_keys(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Start a background sweep task.
    ///
    /// This spawns a tokio task that periodically sweeps stale entries.
    /// Opt-in: callers that own a runtime invoke this once at startup;
    /// the limiter itself never spawns anything.
    pub fn start_sweep_task(self: &Arc<Self>, interval: Duration) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                limiter.sweep();
            }
        });
    }
}

/// Whether strictly more than `window` has passed since `start`.
///
/// A clock that moved backwards yields a negative elapsed duration; the
/// window is then treated as still current rather than expired.
fn window_elapsed(start: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match now.signed_duration_since(start).to_std() {
        Ok(elapsed) => elapsed > window,
        Err(_) => false,
    }
}
