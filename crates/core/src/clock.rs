// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Components that stage notifications or fire timers consume
//! `Arc<dyn Clock>` so that tests can drive time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Controllable clock for tests.
///
/// `now()` reports the construction instant offset by everything passed to
/// [`TestClock::advance`]; `epoch_ms` starts at a fixed value so staged
/// deadlines in tests are deterministic.
pub struct TestClock {
    base: Instant,
    offset_ms: AtomicU64,
    epoch_base_ms: AtomicU64,
}

impl TestClock {
    pub const DEFAULT_EPOCH_MS: u64 = 1_700_000_000_000;

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
            epoch_base_ms: AtomicU64::new(Self::DEFAULT_EPOCH_MS),
        })
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.offset_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Pin the epoch-milliseconds base (offset is preserved).
    pub fn set_epoch_ms(&self, ms: u64) {
        self.epoch_base_ms.store(ms, Ordering::SeqCst);
        self.offset_ms.store(0, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }

    fn epoch_ms(&self) -> u64 {
        self.epoch_base_ms.load(Ordering::SeqCst) + self.offset_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
