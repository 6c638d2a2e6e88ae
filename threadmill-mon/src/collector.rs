//!
//! Metrics collector
//!
//! Samples the registered metric records on a dedicated thread and
//! retains snapshots in a bounded history buffer. Collection failures
//! are counted, never propagated.
//!
use crate::config::MonitorOptions;
use crate::errors::{Error, Result};
use crate::metrics::{
    now_ns, MetricsSnapshot, SystemMetrics, ThreadPoolMetrics, WorkerMetrics,
};
use crate::platform;
use crate::ring::SharedRingBuffer;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Counters describing the collector's own activity.
#[derive(Debug, Default)]
pub(crate) struct CollectionStats {
    total_collections: AtomicU64,
    collection_errors: AtomicU64,
    buffer_overflows: AtomicU64,
    last_collection_ns: AtomicU64,
}

impl CollectionStats {
    fn sample(&self) -> CollectionStatsSample {
        CollectionStatsSample {
            total_collections: self.total_collections.load(Ordering::Relaxed),
            collection_errors: self.collection_errors.load(Ordering::Relaxed),
            buffer_overflows: self.buffer_overflows.load(Ordering::Relaxed),
            last_collection_ns: self.last_collection_ns.load(Ordering::Relaxed),
        }
    }
}

/// Value copy of the collector counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionStatsSample {
    pub total_collections: u64,
    pub collection_errors: u64,
    pub buffer_overflows: u64,
    pub last_collection_ns: u64,
}

// State shared with the collection thread
struct Shared {
    options: MonitorOptions,
    buffer: SharedRingBuffer<MetricsSnapshot>,
    stats: CollectionStats,
    stop: Mutex<bool>,
    wakeup: Condvar,
    system: Mutex<Option<Arc<SystemMetrics>>>,
    thread_pool: Mutex<Option<Arc<ThreadPoolMetrics>>>,
    worker: Mutex<Option<Arc<WorkerMetrics>>>,
}

impl Shared {
    /// Wait one collection interval. Returns `true` when a stop was
    /// requested during the wait.
    fn wait_interval(&self) -> bool {
        let interval = self.options.collection_interval();
        let deadline = Instant::now() + interval;
        let mut stop = self.stop.lock();
        while !*stop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.wakeup.wait_for(&mut stop, remaining);
        }
        *stop
    }

    fn run(&self) {
        log::debug!("Metrics collection loop started");
        while !self.wait_interval() {
            let started = Instant::now();
            self.collect();
            self.stats
                .last_collection_ns
                .store(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
            self.stats.total_collections.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!("Metrics collection loop terminated");
    }

    fn collect(&self) {
        if self.options.enable_system_metrics {
            self.collect_system();
        }
        if self.options.enable_thread_pool_metrics {
            if let Some(thread_pool) = self.thread_pool.lock().as_ref() {
                thread_pool.touch();
            }
        }
        if self.options.enable_worker_metrics {
            if let Some(worker) = self.worker.lock().as_ref() {
                worker.touch();
            }
        }

        if self.buffer.push(self.snapshot()) {
            self.stats.buffer_overflows.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn collect_system(&self) {
        let Some(system) = self.system.lock().clone() else {
            return;
        };
        if !self.options.low_overhead_mode {
            match platform::probe() {
                Ok(probe) => {
                    if let Some(memory) = probe.memory_usage_bytes {
                        system.memory_usage_bytes.store(memory, Ordering::Relaxed);
                    }
                    if let Some(threads) = probe.active_threads {
                        system.active_threads.store(threads, Ordering::Relaxed);
                    }
                }
                Err(err) => {
                    log::debug!("System metrics probe failed: {}", err);
                    self.stats.collection_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        system.touch();
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            system: self
                .system
                .lock()
                .as_ref()
                .map(|m| m.sample())
                .unwrap_or_default(),
            thread_pool: self
                .thread_pool
                .lock()
                .as_ref()
                .map(|m| m.sample())
                .unwrap_or_default(),
            worker: self
                .worker
                .lock()
                .as_ref()
                .map(|m| m.sample())
                .unwrap_or_default(),
            captured_ns: now_ns(),
        }
    }
}

/// Periodic metrics sampler with its own collection thread.
pub struct MetricsCollector {
    shared: Arc<Shared>,
    running: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsCollector {
    /// Create a collector; no thread is spawned until [`start`](Self::start).
    pub fn new(options: MonitorOptions) -> Self {
        let buffer = SharedRingBuffer::new(options.buffer_size());
        Self {
            shared: Arc::new(Shared {
                options,
                buffer,
                stats: CollectionStats::default(),
                stop: Mutex::new(false),
                wakeup: Condvar::new(),
                system: Mutex::new(None),
                thread_pool: Mutex::new(None),
                worker: Mutex::new(None),
            }),
            running: AtomicBool::new(false),
            thread: Mutex::new(None),
        }
    }

    /// Spawn the collection thread.
    pub fn start(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }

        *self.shared.stop.lock() = false;

        let shared = self.shared.clone();
        let thread = std::thread::Builder::new()
            .name("threadmill-mon".into())
            .spawn(move || shared.run())
            .map_err(|err| {
                self.running.store(false, Ordering::Release);
                Error::CollectorSpawn(err)
            })?;

        *self.thread.lock() = Some(thread);
        log::info!(
            "Metrics collector started (interval: {:?})",
            self.shared.options.collection_interval()
        );
        Ok(())
    }

    /// Signal the collection thread and join it. Idempotent.
    pub fn stop(&self) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        {
            let mut stop = self.shared.stop.lock();
            *stop = true;
            self.shared.wakeup.notify_all();
        }
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
        self.running.store(false, Ordering::Release);
        log::info!("Metrics collector stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.shared.options
    }

    /// Register the system record. Replaces any previous handle.
    pub fn register_system(&self, metrics: Arc<SystemMetrics>) {
        *self.shared.system.lock() = Some(metrics);
    }

    /// Register the thread pool record. Replaces any previous handle.
    pub fn register_thread_pool(&self, metrics: Arc<ThreadPoolMetrics>) {
        *self.shared.thread_pool.lock() = Some(metrics);
    }

    /// Register the worker record. Replaces any previous handle.
    pub fn register_worker(&self, metrics: Arc<WorkerMetrics>) {
        *self.shared.worker.lock() = Some(metrics);
    }

    /// Value copy of the registered records at call time; this is not
    /// a sampled point from the history buffer.
    pub fn current_snapshot(&self) -> MetricsSnapshot {
        self.shared.snapshot()
    }

    /// Up to `count` snapshots from the history buffer, oldest first.
    pub fn recent_snapshots(&self, count: usize) -> Vec<MetricsSnapshot> {
        self.shared.buffer.recent(count)
    }

    /// The collector's own activity counters.
    pub fn collection_stats(&self) -> CollectionStatsSample {
        self.shared.stats.sample()
    }
}

impl Drop for MetricsCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

// =======================
// Tests
// =======================
