//! Per-device dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single device's dispatch worker
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Commands delivered successfully
    success_count: AtomicU64,
    /// Commands that exhausted their retries
    failure_count: AtomicU64,
    /// Individual retry attempts
    retry_count: AtomicU64,
    /// Attempts abandoned at the request timeout
    timeout_count: AtomicU64,
    /// Dispatches rejected because the queue was full
    busy_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn inc_success_count(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub fn inc_retry_count(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }

    pub fn inc_timeout_count(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn busy_count(&self) -> u64 {
        self.busy_count.load(Ordering::Relaxed)
    }

    pub fn inc_busy_count(&self) {
        self.busy_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            retry_count: self.retry_count(),
            timeout_count: self.timeout_count(),
            busy_count: self.busy_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct DispatchSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub retry_count: u64,
    pub timeout_count: u64,
    pub busy_count: u64,
}
