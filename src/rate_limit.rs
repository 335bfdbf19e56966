use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// Rate limit entry - tracks requests per IP/key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub window_start: u64, // clock millis
}

impl WindowState {
    fn started_at(now: u64) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.window_start)
    }

    pub fn is_expired(&self, now: u64, window: Duration) -> bool {
        self.elapsed(now) > window.as_millis() as u64
    }
}

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window closes. Only set on denial.
    pub retry_after: Option<Duration>,
}

impl Decision {
    fn allow(limit: u32, count: u32) -> Self {
        Self {
            allowed: true,
            remaining: limit.saturating_sub(count),
            retry_after: None,
        }
    }

    fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after: Some(retry_after),
        }
    }
}

/// Client key -> fixed window map.
///
/// All mutation goes through [`RateLimitStore::record_and_check`], which does
/// its read-modify-write while holding the lock of the shard owning the key.
/// Unrelated keys on other shards are never blocked.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    windows: DashMap<String, WindowState>,
    // key count kept alongside the map so reading it takes no shard locks
    tracked: AtomicUsize,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request for `key` and decide whether it may proceed.
    ///
    /// An absent or expired window is replaced by a fresh one with `count = 1`.
    /// Inside an open window the count is incremented only while it is below
    /// `limit`; a denied request leaves the window untouched.
    pub fn record_and_check(&self, key: &str, now: u64, limit: u32, window: Duration) -> Decision {
        match self.windows.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                // count while the shard is still locked so a purge can't run in between
                let _window = vacant.insert(WindowState::started_at(now));
                self.tracked.fetch_add(1, Ordering::Relaxed);
                Decision::allow(limit, 1)
            }
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();

                //windows expired..? Reset it
                if state.is_expired(now, window) {
                    *state = WindowState::started_at(now);
                    return Decision::allow(limit, 1);
                }

                // under limit.? Allow
                if state.count < limit {
                    state.count += 1;
                    return Decision::allow(limit, state.count);
                }

                //over limit
                let window_ms = window.as_millis() as u64;
                let retry_ms = window_ms.saturating_sub(state.elapsed(now));
                Decision::deny(Duration::from_millis(retry_ms))
            }
        }
    }

    /// Drop every window that has expired at `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: u64, window: Duration) -> usize {
        let mut purged = 0;
        self.windows.retain(|_, state| {
            let keep = !state.is_expired(now, window);
            if !keep {
                purged += 1;
            }
            keep
        });
        self.tracked.fetch_sub(purged, Ordering::Relaxed);
        purged
    }

    /// Number of tracked keys, without locking any shard.
    pub fn tracked(&self) -> usize {
        self.tracked.load(Ordering::Relaxed)
    }

    pub fn get(&self, key: &str) -> Option<WindowState> {
        self.windows.get(key).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
