//!
//! Pool workers
//!
//! A worker is a dedicated OS thread bound to an ordered subset of the
//! pool's priorities. Its only suspension point is the blocking wait
//! inside `dequeue`; stop is cooperative and never abandons a running
//! job.
//!
use crate::errors::{Error, Result};
use crate::priority::Priority;
use crate::queue::PriorityQueue;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use threadmill_mon::{ScopedTimer, ThreadPoolMetrics, WorkerMetrics};

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Created = 0,
    Waiting,
    Working,
    Stopping,
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::Waiting,
            2 => WorkerState::Working,
            3 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Created => "created",
            WorkerState::Waiting => "waiting",
            WorkerState::Working => "working",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

// State shared between the pool's view and the worker thread
struct WorkerShared {
    state: AtomicU8,
    metrics: Arc<WorkerMetrics>,
}

impl WorkerShared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Handle to a single worker thread, owned by the pool.
pub struct Worker<P: Priority> {
    name: String,
    priorities: Vec<P>,
    shared: Arc<WorkerShared>,
    thread: Option<JoinHandle<()>>,
}

impl<P: Priority> Worker<P> {
    pub(crate) fn new(name: String, priorities: Vec<P>) -> Result<Self> {
        if priorities.is_empty() {
            return Err(Error::EmptyPriorities);
        }
        Ok(Self {
            name,
            priorities,
            shared: Arc::new(WorkerShared {
                state: AtomicU8::new(WorkerState::Created as u8),
                metrics: Arc::new(WorkerMetrics::default()),
            }),
            thread: None,
        })
    }

    /// Name of the worker thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered responsibility set.
    pub fn priorities(&self) -> &[P] {
        &self.priorities
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// This worker's metric record.
    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.shared.metrics.clone()
    }

    pub(crate) fn spawn(
        &mut self,
        queue: Arc<PriorityQueue<P>>,
        pool_metrics: Arc<ThreadPoolMetrics>,
    ) -> Result<()> {
        self.shared.set_state(WorkerState::Created);
        let shared = self.shared.clone();
        let priorities = self.priorities.clone();
        let name = self.name.clone();
        let thread = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run_loop(&name, &shared, &priorities, queue, pool_metrics))
            .map_err(Error::WorkerSpawn)?;
        self.thread = Some(thread);
        Ok(())
    }

    pub(crate) fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// The worker loop. Exits only when the queue reports `Stopped`.
fn run_loop<P: Priority>(
    name: &str,
    shared: &WorkerShared,
    priorities: &[P],
    queue: Arc<PriorityQueue<P>>,
    pool_metrics: Arc<ThreadPoolMetrics>,
) {
    log::debug!("[{}] worker started", name);
    loop {
        shared.set_state(WorkerState::Waiting);
        pool_metrics.idle_threads.fetch_add(1, Ordering::Relaxed);
        let next = {
            let _idle = ScopedTimer::new(&shared.metrics.idle_time_ns);
            queue.dequeue(priorities)
        };
        pool_metrics.idle_threads.fetch_sub(1, Ordering::Relaxed);

        let Ok(job) = next else {
            // Queue is stopped and our partitions are drained
            break;
        };

        shared.set_state(WorkerState::Working);
        shared.metrics.context_switches.fetch_add(1, Ordering::Relaxed);
        pool_metrics
            .jobs_pending
            .store(queue.size() as u64, Ordering::Relaxed);

        let label = job.name().to_string();
        let started = Instant::now();
        let result = job.run();
        let elapsed = started.elapsed().as_nanos() as u64;

        shared.metrics.jobs_processed.fetch_add(1, Ordering::Relaxed);
        shared
            .metrics
            .total_processing_time_ns
            .fetch_add(elapsed, Ordering::Relaxed);
        shared.metrics.touch();

        match result {
            Ok(()) => {
                let completed = pool_metrics.jobs_completed.fetch_add(1, Ordering::Relaxed) + 1;
                let total = pool_metrics
                    .total_execution_time_ns
                    .fetch_add(elapsed, Ordering::Relaxed)
                    + elapsed;
                pool_metrics
                    .average_latency_ns
                    .store(total / completed, Ordering::Relaxed);
            }
            Err(err) => {
                shared.metrics.jobs_failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("[{}] job '{}' failed: {}", name, label, err);
            }
        }
    }
    shared.set_state(WorkerState::Stopping);
    log::debug!("[{}] worker stopped", name);
    shared.set_state(WorkerState::Stopped);
}

// =======================
// Tests
// =======================
