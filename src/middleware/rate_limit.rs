//! Sliding-window limiter for credential endpoints.
//!
//! Keys are caller-chosen (tenant + email for login) so a spray against
//! one account is throttled regardless of source address. Two defenses
//! bound memory: periodic cleanup of idle keys and a hard cap on tracked
//! keys; at the cap, unseen keys are rejected outright.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

const CLEANUP_EVERY: u64 = 100;
const MAX_TRACKED_KEYS: usize = 10_000;

pub struct SlidingWindowLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: RwLock<HashMap<String, Vec<Instant>>>,
    request_counter: AtomicU64,
}

impl SlidingWindowLimiter {
    pub fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(window_secs),
            attempts: RwLock::new(HashMap::new()),
            request_counter: AtomicU64::new(0),
        }
    }

    /// Record an attempt for `key`; returns false when the key is over
    /// its budget for the current window.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let count = self.request_counter.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_EVERY == 0 {
            self.cleanup(now);
        }

        let mut attempts = match self.attempts.write() {
            Ok(guard) => guard,
            // A poisoned lock fails open; blocking all logins is worse
            Err(_) => return true,
        };

        if !attempts.contains_key(key) && attempts.len() >= MAX_TRACKED_KEYS {
            return false;
        }

        let window = self.window;
        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < window);

        if entry.len() >= self.max_attempts as usize {
            return false;
        }
        entry.push(now);
        true
    }

    fn cleanup(&self, now: Instant) {
        if let Ok(mut attempts) = self.attempts.write() {
            let window = self.window;
            attempts.retain(|_, times| {
                times.retain(|t| now.duration_since(*t) < window);
                !times.is_empty()
            });
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.attempts.read().map(|a| a.len()).unwrap_or(0)
    }
}

/// Process-wide limiter for login attempts, sized from config
pub fn login_limiter() -> &'static SlidingWindowLimiter {
    use std::sync::OnceLock;
    static LIMITER: OnceLock<SlidingWindowLimiter> = OnceLock::new();
    LIMITER.get_or_init(|| {
        let api = &crate::config::config().api;
        SlidingWindowLimiter::new(
            api.login_rate_limit_attempts,
            api.login_rate_limit_window_secs,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_budget_then_blocks() {
        let limiter = SlidingWindowLimiter::new(3, 60);
        let now = Instant::now();
        assert!(limiter.check_at("t:alice", now));
        assert!(limiter.check_at("t:alice", now));
        assert!(limiter.check_at("t:alice", now));
        assert!(!limiter.check_at("t:alice", now));
        // Other keys are unaffected
        assert!(limiter.check_at("t:bob", now));
    }

    #[test]
    fn window_expiry_restores_budget() {
        let limiter = SlidingWindowLimiter::new(1, 60);
        let start = Instant::now();
        assert!(limiter.check_at("k", start));
        assert!(!limiter.check_at("k", start + Duration::from_secs(30)));
        assert!(limiter.check_at("k", start + Duration::from_secs(61)));
    }

    #[test]
    fn cleanup_drops_idle_keys() {
        let limiter = SlidingWindowLimiter::new(5, 1);
        let start = Instant::now();
        for i in 0..10 {
            limiter.check_at(&format!("key-{}", i), start);
        }
        assert!(limiter.tracked_keys() >= 10);
        limiter.cleanup(start + Duration::from_secs(2));
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
