//! Request limiting.
//!
//! Login attempts are throttled per client address with a fixed window: the first attempt from an
//! address opens a window of `window` length, and at most `max_attempts` attempts are admitted
//! until it closes. Every attempt counts, successful or not.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::{AuthConfig, LoginRateLimitConfig};
use crate::errors::{Error, Result};

/// Expired windows are swept once the map grows past this many keys.
const PURGE_THRESHOLD: usize = 10_000;

/// Container for all limiters. `None` means the limiter is disabled.
#[derive(Debug, Default, Clone)]
pub struct Limiters {
    pub login: Option<Arc<LoginRateLimiter>>,
}

impl Limiters {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            login: LoginRateLimiter::new(&config.login_rate_limit).map(Arc::new),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    attempts: u32,
}

/// Fixed-window attempt counter keyed by client address.
#[derive(Debug)]
pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl LoginRateLimiter {
    /// Returns `None` when `max_attempts` is 0 (limiting disabled).
    pub fn new(config: &LoginRateLimitConfig) -> Option<Self> {
        if config.max_attempts == 0 {
            return None;
        }
        Some(Self {
            max_attempts: config.max_attempts,
            window: config.window,
            windows: DashMap::new(),
        })
    }

    /// Count an attempt from `key`, rejecting it with 429 when the window is exhausted.
    pub fn check(&self, key: &str) -> Result<()> {
        self.check_at(key, Instant::now())
    }

    pub(crate) fn check_at(&self, key: &str, now: Instant) -> Result<()> {
        let outcome = {
            let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
                started: now,
                attempts: 0,
            });
            let window = entry.value_mut();

            if now.saturating_duration_since(window.started) >= self.window {
                *window = Window {
                    started: now,
                    attempts: 0,
                };
            }

            if window.attempts >= self.max_attempts {
                let elapsed = now.saturating_duration_since(window.started);
                Err(self.window.saturating_sub(elapsed))
            } else {
                window.attempts += 1;
                Ok(())
            }
        };

        // The entry guard is released above; retain() would deadlock on the same shard otherwise
        if self.windows.len() > PURGE_THRESHOLD {
            self.purge_expired(now);
        }

        outcome.map_err(|remaining| {
            metrics::counter!("maamul_login_attempts_rejected_total").increment(1);
            tracing::warn!(key, "Login rate limit exceeded");
            Error::TooManyRequests {
                message: "Too many login attempts. Please try again later.".to_string(),
                retry_after_secs: remaining.as_secs().max(1),
            }
        })
    }

    fn purge_expired(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_secs: u64) -> LoginRateLimiter {
        LoginRateLimiter::new(&LoginRateLimitConfig {
            max_attempts,
            window: Duration::from_secs(window_secs),
            trust_forwarded_headers: false,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_attempt_after_max() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", now).is_ok());
        }
        let err = limiter.check_at("10.0.0.1", now).unwrap_err();
        assert!(matches!(err, Error::TooManyRequests { retry_after_secs: 60, .. }));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", now).is_ok());
        assert!(limiter.check_at("10.0.0.1", now).is_err());
        assert!(limiter.check_at("10.0.0.2", now).is_ok());
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = limiter(2, 60);
        let start = Instant::now();

        assert!(limiter.check_at("ip", start).is_ok());
        assert!(limiter.check_at("ip", start + Duration::from_secs(10)).is_ok());
        let err = limiter.check_at("ip", start + Duration::from_secs(50)).unwrap_err();
        assert!(matches!(err, Error::TooManyRequests { retry_after_secs: 10, .. }));

        // Fixed window: measured from the first attempt, not the last
        assert!(limiter.check_at("ip", start + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_disabled_when_zero_attempts() {
        let config = LoginRateLimitConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(LoginRateLimiter::new(&config).is_none());
    }

    #[test]
    fn test_purge_drops_only_expired_windows() {
        let limiter = limiter(5, 60);
        let start = Instant::now();

        limiter.check_at("old", start).unwrap();
        limiter.check_at("fresh", start + Duration::from_secs(59)).unwrap();
        limiter.purge_expired(start + Duration::from_secs(61));

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.windows.contains_key("fresh"));
    }
}
