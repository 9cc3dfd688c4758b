//! # Request Rate Limiting
//!
//! Per-client request counting over fixed windows.
//!
//! ```text
//!   client "10.0.0.7"   limit 3 / 60s
//!
//!   t=0s   check → Allowed(2)      window opens at t=0
//!   t=5s   check → Allowed(1)
//!   t=9s   check → Allowed(0)
//!   t=12s  check → Limited(48s)
//!   t=61s  check → Allowed(2)      new window
//! ```
//!
//! The limiter owns its state. Handlers receive it as a `dyn RateLimiter`
//! so tests can drive time with [`ManualClock`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.elapsed) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *lock(&self.elapsed)
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request counted; `remaining` more fit in the current window.
    Allowed { remaining: u32 },
    /// Window is full until `retry_after` has passed.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Counts requests per client.
pub trait RateLimiter: Send + Sync {
    /// Counts one request from `client` and decides whether it may proceed.
    fn check(&self, client: &str) -> RateDecision;

    /// Drops state for clients whose window has ended. Returns how many.
    fn sweep(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by client identity.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    /// ## Example
    /// ```rust
    /// use std::time::Duration;
    /// use stockbook_core::rate_limit::{FixedWindowLimiter, RateLimiter};
    ///
    /// let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
    /// assert!(limiter.check("a").is_allowed());
    /// assert!(limiter.check("a").is_allowed());
    /// assert!(!limiter.check("a").is_allowed());
    /// assert!(limiter.check("b").is_allowed());
    /// ```
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        FixedWindowLimiter {
            limit,
            window,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        lock(&self.windows).len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, client: &str) -> RateDecision {
        let now = self.clock.now();
        let mut windows = lock(&self.windows);

        let entry = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.limit {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.started));
            return RateDecision::Limited { retry_after };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.limit - entry.count,
        }
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut windows = lock(&self.windows);
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
        before - windows.len()
    }
}

// A panic while holding the lock leaves only counters behind; keep using them.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
