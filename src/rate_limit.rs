use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

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
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
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
    pub post_limit: usize,
    pub post_window: Duration,
    pub like_limit: usize,
    pub like_window: Duration,
    pub media_limit: usize,
    pub media_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            post_limit: 5,
            post_window: Duration::from_secs(60),
            like_limit: 60,
            like_window: Duration::from_secs(60),
            media_limit: 30,
            media_window: Duration::from_secs(3600),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        fn dur_env(name: &str, default: Duration) -> Duration {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).map(Duration::from_secs).unwrap_or(default)
        }
        let d = Self::default();
        Self {
            post_limit: usize_env("RL_POST_LIMIT", d.post_limit),
            post_window: dur_env("RL_POST_WINDOW", d.post_window),
            like_limit: usize_env("RL_LIKE_LIMIT", d.like_limit),
            like_window: dur_env("RL_LIKE_WINDOW", d.like_window),
            media_limit: usize_env("RL_MEDIA_LIMIT", d.media_limit),
            media_window: dur_env("RL_MEDIA_WINDOW", d.media_window),
        }
    }
}

/// Per-action guard used by handlers, keyed by auth subject.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }
    pub fn allow_post(&self, who: &str) -> bool {
        self.limiter.check(&format!("post:{who}"), self.cfg.post_limit, self.cfg.post_window)
    }
    pub fn allow_like(&self, who: &str) -> bool {
        self.limiter.check(&format!("like:{who}"), self.cfg.like_limit, self.cfg.like_window)
    }
    pub fn allow_media(&self, who: &str) -> bool {
        self.limiter.check(&format!("media:{who}"), self.cfg.media_limit, self.cfg.media_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 {
            assert!(rl.check("k", 3, window));
        }
        assert!(!rl.check("k", 3, window));
        std::thread::sleep(Duration::from_millis(60));
        assert!(rl.check("k", 3, window));
    }

    #[test]
    fn actions_are_counted_separately() {
        let cfg = RateLimitConfig { post_limit: 1, like_limit: 1, ..RateLimitConfig::default() };
        let rl = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
        assert!(rl.allow_post("alice"));
        assert!(!rl.allow_post("alice"));
        assert!(rl.allow_post("bob"));
        assert!(rl.allow_like("alice"));
    }

    #[test]
    fn disabled_limiter_allows_everything() {
        let rl = InMemoryRateLimiter::new(false);
        for _ in 0..10 {
            assert!(rl.check("k", 1, Duration::from_secs(60)));
        }
    }
}
