//! Per-client request throttling.
//!
//! The limiter is a trait so deployments can swap the backing store: the
//! in-memory implementation here fits a single-instance deployment, while a
//! multi-instance fleet wants one backed by a shared store with TTLs.
//! Counting is per process; instances do not see each other's requests.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

/// Time source. Injectable so tests can run against a fixed clock.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. For deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Decision for a single inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited,
}

impl RateDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Per-key request throttle.
///
/// Implementations must be safe to share across async tasks
/// (`Send + Sync`).
#[async_trait]
pub trait RateLimiter: Send + Sync + 'static {
    /// Record one request for `key` and decide whether it may proceed.
    async fn check(&self, key: &str) -> RateDecision;
}

#[derive(Debug)]
struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Fixed-window in-memory limiter.
///
/// One counter per key inside a fixed window; a record older than the
/// window is expired and restarts the count at 1. State lives for the
/// process lifetime only and resets on restart.
pub struct MemoryRateLimiter<C: Clock = SystemClock> {
    window: Duration,
    max_requests: u32,
    clock: C,
    records: Mutex<HashMap<String, Window>>,
}

impl MemoryRateLimiter<SystemClock> {
    /// Limiter on the system clock.
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self::with_clock(window, max_requests, SystemClock)
    }
}

impl<C: Clock> MemoryRateLimiter<C> {
    /// Limiter on an explicit clock.
    #[must_use]
    pub fn with_clock(window: Duration, max_requests: u32, clock: C) -> Self {
        Self {
            window,
            max_requests,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<C: Clock> RateLimiter for MemoryRateLimiter<C> {
    async fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        let mut records = self.records.lock().await;

        match records.entry(key.to_owned()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if now - record.started_at > self.window {
                    // Expired window: restart the count at 1.
                    *record = Window {
                        count: 1,
                        started_at: now,
                    };
                    RateDecision::Allowed
                } else if record.count >= self.max_requests {
                    debug!(key, count = record.count, "rate limit exceeded");
                    RateDecision::Limited
                } else {
                    record.count += 1;
                    RateDecision::Allowed
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Window {
                    count: 1,
                    started_at: now,
                });
                RateDecision::Allowed
            }
        }
    }
}
