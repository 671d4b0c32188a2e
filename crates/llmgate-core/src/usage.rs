//! Usage accountant: process-wide cumulative token counter.
//!
//! Created once at startup and shared as `Arc<UsageAccountant>`; there is no
//! reset other than restarting the process.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe monotonic token counter.
#[derive(Debug, Default)]
pub struct UsageAccountant {
    total: AtomicU64,
}

impl UsageAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` tokens. Wraps on overflow like the native integer.
    pub fn add_usage(&self, count: u64) {
        self.total.fetch_add(count, Ordering::Relaxed);
    }

    /// Total tokens recorded since startup.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
