use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

use crate::app_config::{bool_env, dur_env, usize_env};

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window { entry.pop_front(); } else { break; }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub clear_limit: usize,
    pub clear_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: true, clear_limit: 1, clear_window: Duration::from_secs(10) }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            enabled: bool_env("RATE_LIMIT_ENABLED", d.enabled),
            clear_limit: usize_env("RL_CLEAR_LIMIT", d.clear_limit),
            clear_window: dur_env("RL_CLEAR_WINDOW", d.clear_window.as_secs()),
        }
    }
}

/// High level guard used by handlers.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }

    pub fn from_env() -> Self {
        let cfg = RateLimitConfig::from_env();
        Self::new(InMemoryRateLimiter::new(cfg.enabled), cfg)
    }

    /// `clear-reports`, keyed by the caller's platform id.
    pub fn allow_clear(&self, caller: &str) -> bool {
        self.limiter.check(&format!("clear:{caller}"), self.cfg.clear_limit, self.cfg.clear_window)
    }
}
