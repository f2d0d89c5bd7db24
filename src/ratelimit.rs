use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::warn;

/// Requests per window allowed on the JSON endpoints.
pub const FETCH_LIMIT: u32 = 30;
pub const UPDATE_LIMIT: u32 = 30;
pub const LOGIN_LIMIT: u32 = 10;

const WINDOW: Duration = Duration::from_secs(60);

/// Time source, swappable so tests can drive the window by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sliding-window rate limiter keyed by (client address, endpoint)
///
/// Held in process memory only: not shared across workers, reset on restart.
/// Old timestamps age out of the window as they are pruned on each check.
pub struct RateLimiter {
    window: Duration,
    clock: Box<dyn Clock>,
    hits: Mutex<HashMap<(String, &'static str), VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            window: WINDOW,
            clock,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request and report whether it is within the limit.
    pub fn allow(&self, client: &str, endpoint: &'static str, limit: u32) -> bool {
        let now = self.clock.now();
        let mut hits = self.hits.lock().unwrap();
        let window = self.window;

        let entry = hits
            .entry((client.to_string(), endpoint))
            .or_insert_with(VecDeque::new);

        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() as u32 >= limit {
            warn!("Rate limit hit for {} on {}", client, endpoint);
            return false;
        }

        entry.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Manually-advanced clock for the window tests.
    struct FakeClock {
        now: Mutex<Instant>,
    }

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    struct SharedClock(Arc<FakeClock>);

    impl Clock for SharedClock {
        fn now(&self) -> Instant {
            *self.0.now.lock().unwrap()
        }
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Box::new(SharedClock(clock)));

        for _ in 0..5 {
            assert!(limiter.allow("1.2.3.4", "fetch", 5));
        }
        assert!(!limiter.allow("1.2.3.4", "fetch", 5));
    }

    #[test]
    fn window_expiry_readmits() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Box::new(SharedClock(clock.clone())));

        for _ in 0..3 {
            assert!(limiter.allow("1.2.3.4", "fetch", 3));
        }
        assert!(!limiter.allow("1.2.3.4", "fetch", 3));

        clock.advance(Duration::from_secs(61));
        assert!(limiter.allow("1.2.3.4", "fetch", 3));
    }

    #[test]
    fn clients_and_endpoints_tracked_independently() {
        let clock = FakeClock::new();
        let limiter = RateLimiter::with_clock(Box::new(SharedClock(clock)));

        assert!(limiter.allow("1.2.3.4", "fetch", 1));
        assert!(!limiter.allow("1.2.3.4", "fetch", 1));

        // Different client and different endpoint both have their own window.
        assert!(limiter.allow("5.6.7.8", "fetch", 1));
        assert!(limiter.allow("1.2.3.4", "update", 1));
    }
}
