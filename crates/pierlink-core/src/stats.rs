//! Message statistics recorder.
//!
//! Latency samples (nanoseconds from receive to relay) are kept for the
//! life of the process together with one counter per origin platform.
//! Both piers record concurrently; samples go under a mutex and counters
//! are atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use pierlink_types::message::{Message, PlatformType};

pub struct StatsManager {
    started_at: Instant,
    timings: Mutex<Vec<u64>>,
    from_irc: AtomicU64,
    from_discord: AtomicU64,
}

impl Default for StatsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsManager {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    /// A manager whose uptime is measured from `started_at`.
    pub fn started_at(started_at: Instant) -> Self {
        Self {
            started_at,
            timings: Mutex::new(Vec::new()),
            from_irc: AtomicU64::new(0),
            from_discord: AtomicU64::new(0),
        }
    }

    /// Record one relayed message from `origin` that took `latency`.
    pub fn record_latency(&self, origin: PlatformType, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.timings.lock().push(nanos);
        self.counter(origin).fetch_add(1, Ordering::Relaxed);
    }

    /// Record a relayed message, measuring latency from its receive instant.
    pub fn record_message(&self, message: &Message, relayed_at: Instant) {
        self.record_latency(
            message.source.platform,
            relayed_at.saturating_duration_since(message.received_at),
        );
    }

    /// Snapshot of all latency samples in nanoseconds, in record order.
    pub fn timings(&self) -> Vec<u64> {
        self.timings.lock().clone()
    }

    pub fn total_from(&self, origin: PlatformType) -> u64 {
        self.counter(origin).load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.uptime_at(Instant::now())
    }

    pub fn uptime_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    fn counter(&self, origin: PlatformType) -> &AtomicU64 {
        match origin {
            PlatformType::Irc => &self.from_irc,
            PlatformType::Discord => &self.from_discord,
        }
    }
}
