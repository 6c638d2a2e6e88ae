//!
//! Shared metric records
//!
//! Records are flat sets of atomic counters and gauges updated lock-free
//! by the pool and its workers. The collector turns them into value
//! samples at each collection cycle. Counter updates use relaxed ordering;
//! a sample may mix counters from slightly different moments.
//!
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Wall clock timestamp in nanoseconds since the unix epoch.
pub(crate) fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Process-wide gauges sampled from the platform.
///
/// `cpu_usage_percent` and `total_allocations` are externally updated
/// gauges; the collector fills `memory_usage_bytes` and `active_threads`
/// from the platform probe.
#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub cpu_usage_percent: AtomicU64,
    pub memory_usage_bytes: AtomicU64,
    pub active_threads: AtomicU64,
    pub total_allocations: AtomicU64,
    timestamp_ns: AtomicU64,
}

impl SystemMetrics {
    /// Mark the record as refreshed
    pub fn touch(&self) {
        self.timestamp_ns.store(now_ns(), Ordering::Relaxed);
    }

    /// Value copy of the record
    pub fn sample(&self) -> SystemSample {
        SystemSample {
            cpu_usage_percent: self.cpu_usage_percent.load(Ordering::Relaxed),
            memory_usage_bytes: self.memory_usage_bytes.load(Ordering::Relaxed),
            active_threads: self.active_threads.load(Ordering::Relaxed),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            timestamp_ns: self.timestamp_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemSample {
    pub cpu_usage_percent: u64,
    pub memory_usage_bytes: u64,
    pub active_threads: u64,
    pub total_allocations: u64,
    pub timestamp_ns: u64,
}

/// Pool-wide counters and gauges.
///
/// `jobs_pending` and `idle_threads` are gauges, everything else is
/// monotonic while the pool lives.
#[derive(Debug, Default)]
pub struct ThreadPoolMetrics {
    pub jobs_completed: AtomicU64,
    pub jobs_pending: AtomicU64,
    pub total_execution_time_ns: AtomicU64,
    pub average_latency_ns: AtomicU64,
    pub worker_threads: AtomicU64,
    pub idle_threads: AtomicU64,
    timestamp_ns: AtomicU64,
}

impl ThreadPoolMetrics {
    /// Mark the record as refreshed
    pub fn touch(&self) {
        self.timestamp_ns.store(now_ns(), Ordering::Relaxed);
    }

    /// Value copy of the record
    pub fn sample(&self) -> ThreadPoolSample {
        ThreadPoolSample {
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_pending: self.jobs_pending.load(Ordering::Relaxed),
            total_execution_time_ns: self.total_execution_time_ns.load(Ordering::Relaxed),
            average_latency_ns: self.average_latency_ns.load(Ordering::Relaxed),
            worker_threads: self.worker_threads.load(Ordering::Relaxed),
            idle_threads: self.idle_threads.load(Ordering::Relaxed),
            timestamp_ns: self.timestamp_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadPoolSample {
    pub jobs_completed: u64,
    pub jobs_pending: u64,
    pub total_execution_time_ns: u64,
    pub average_latency_ns: u64,
    pub worker_threads: u64,
    pub idle_threads: u64,
    pub timestamp_ns: u64,
}

/// Per-worker counters.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    pub jobs_processed: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub total_processing_time_ns: AtomicU64,
    pub idle_time_ns: AtomicU64,
    pub context_switches: AtomicU64,
    timestamp_ns: AtomicU64,
}

impl WorkerMetrics {
    /// Mark the record as refreshed
    pub fn touch(&self) {
        self.timestamp_ns.store(now_ns(), Ordering::Relaxed);
    }

    /// Value copy of the record
    pub fn sample(&self) -> WorkerSample {
        WorkerSample {
            jobs_processed: self.jobs_processed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            total_processing_time_ns: self.total_processing_time_ns.load(Ordering::Relaxed),
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
            context_switches: self.context_switches.load(Ordering::Relaxed),
            timestamp_ns: self.timestamp_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerSample {
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub total_processing_time_ns: u64,
    pub idle_time_ns: u64,
    pub context_switches: u64,
    pub timestamp_ns: u64,
}

/// Value copy of every registered record at an instant.
///
/// Unregistered categories sample as all-zero defaults.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub system: SystemSample,
    pub thread_pool: ThreadPoolSample,
    pub worker: WorkerSample,
    pub captured_ns: u64,
}

/// RAII timer adding the elapsed nanoseconds to a counter on drop.
pub struct ScopedTimer<'a> {
    target: &'a AtomicU64,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(target: &'a AtomicU64) -> Self {
        Self {
            target,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        self.target
            .fetch_add(self.start.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }
}

// =======================
// Tests
// =======================
