use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::{RATE_LIMIT, RATE_LIMIT_WINDOW_MS};
use crate::error::{GatewayError, Result};
use crate::metrics::RATE_LIMIT_KEYS;
use crate::rate_limit::{Decision, RateLimitStore};

/// Limit and window applied to every client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: RATE_LIMIT,
            window: Duration::from_millis(RATE_LIMIT_WINDOW_MS),
        }
    }
}

/// Fixed-window policy over a [`RateLimitStore`].
///
/// Holds no request state of its own; every decision is made by the store
/// using a timestamp taken from the injected clock.
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
    clock: Arc<dyn Clock>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(
        store: Arc<RateLimitStore>,
        clock: Arc<dyn Clock>,
        policy: RateLimitPolicy,
    ) -> Result<Self> {
        if policy.limit == 0 {
            return Err(GatewayError::Config("rate limit must be at least 1".into()));
        }
        if policy.window.is_zero() {
            return Err(GatewayError::Config("rate limit window must be non-zero".into()));
        }
        Ok(Self {
            store,
            clock,
            policy,
        })
    }

    pub fn check(&self, key: &str) -> Decision {
        let now = self.clock.now_millis();
        let decision = self
            .store
            .record_and_check(key, now, self.policy.limit, self.policy.window);
        RATE_LIMIT_KEYS.set(self.store.tracked() as f64);
        decision
    }

    /// Purge windows that have already expired.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let purged = self.store.purge_expired(now, self.policy.window);
        RATE_LIMIT_KEYS.set(self.store.tracked() as f64);
        purged
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn store(&self) -> &RateLimitStore {
        &self.store
    }
}

// Sweeper - drops expired windows so idle clients don't pile up
pub async fn purge_task(limiter: Arc<RateLimiter>, every: Duration) {
    let mut ticker = interval(every);
    info!(interval = ?every, "Rate limit sweeper started");

    loop {
        ticker.tick().await;
        let purged = limiter.sweep();
        if purged > 0 {
            debug!(purged, remaining_keys = limiter.store().tracked(), "Purged expired rate limit windows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter_with(clock: Arc<ManualClock>, limit: u32) -> RateLimiter {
        RateLimiter::new(
            Arc::new(RateLimitStore::new()),
            clock,
            RateLimitPolicy {
                limit,
                window: Duration::from_secs(60),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.limit, 50);
        assert_eq!(policy.window, Duration::from_millis(60_000));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = RateLimiter::new(
            Arc::new(RateLimitStore::new()),
            Arc::new(ManualClock::new(0)),
            RateLimitPolicy {
                limit: 0,
                window: Duration::from_secs(60),
            },
        );
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_limit_plus_one_is_denied() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(clock.clone(), 50);

        for _ in 0..50 {
            assert!(limiter.check("1.2.3.4").allowed);
        }
        clock.advance(Duration::from_millis(100));
        let denied = limiter.check("1.2.3.4");
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_millis(59_900)));
    }

    #[test]
    fn test_uses_clock_for_window_reset() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(clock.clone(), 2);

        limiter.check("k");
        limiter.check("k");
        assert!(!limiter.check("k").allowed);

        clock.set(61_000);
        let decision = limiter.check("k");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_sweep_uses_policy_window() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = limiter_with(clock.clone(), 5);
        limiter.check("a");
        limiter.check("b");

        assert_eq!(limiter.sweep(), 0);
        clock.set(60_001);
        assert_eq!(limiter.sweep(), 2);
        assert!(limiter.store().is_empty());
        assert_eq!(limiter.store().tracked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_sweeps_periodically() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(limiter_with(clock.clone(), 5));
        limiter.check("idle");
        clock.set(120_000);

        let task = tokio::spawn(purge_task(limiter.clone(), Duration::from_secs(30)));
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(limiter.store().is_empty());
        task.abort();
    }
}
