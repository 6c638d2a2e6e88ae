//!
//! Priority thread pool
//!
//! Owns the queue and the workers. Shutdown is two-phase: quiesce the
//! queue (drain) then terminate it, so that workers at different
//! priorities can pick up the tail of the backlog concurrently without
//! deadlocking the caller.
//!
use crate::errors::{Error, Result};
use crate::job::{CallbackJob, Job};
use crate::priority::Priority;
use crate::queue::PriorityQueue;
use crate::worker::{Worker, WorkerState};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use threadmill_mon::ThreadPoolMetrics;

// Poll period while waiting for the queue to drain
const DRAIN_THROTTLE: Duration = Duration::from_millis(1);

/// Pool lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Constructed = 0,
    Started,
    Stopping,
    Stopped,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Constructed,
            1 => PoolState::Started,
            2 => PoolState::Stopping,
            _ => PoolState::Stopped,
        }
    }
}

/// A pool of worker threads over a priority-partitioned queue.
///
/// Workers are added before `start()`; each one services an ordered
/// subset of the pool's priorities. Provision at least one worker
/// listing the lowest priority or the tail of the ladder can starve.
pub struct ThreadPool<P: Priority> {
    name: String,
    queue: Arc<PriorityQueue<P>>,
    workers: Vec<Worker<P>>,
    metrics: Arc<ThreadPoolMetrics>,
    state: AtomicU8,
    enqueued: AtomicU64,
}

impl<P: Priority> ThreadPool<P> {
    /// Create a pool over the given priority set.
    ///
    /// The set is fixed for the lifetime of the pool.
    pub fn new<I>(priorities: I) -> Self
    where
        I: IntoIterator<Item = P>,
    {
        Self::named("threadmill", priorities)
    }

    /// Create a named pool; the name prefixes worker thread names.
    pub fn named<I>(name: &str, priorities: I) -> Self
    where
        I: IntoIterator<Item = P>,
    {
        Self {
            name: name.to_string(),
            queue: Arc::new(PriorityQueue::new(priorities)),
            workers: Vec::new(),
            metrics: Arc::new(ThreadPoolMetrics::default()),
            state: AtomicU8::new(PoolState::Constructed as u8),
            enqueued: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.state() == PoolState::Started
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a worker servicing the given priorities, scanned in order.
    ///
    /// Valid only before `start()` (or between a full stop and a
    /// restart).
    pub fn add_worker<I>(&mut self, priorities: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
    {
        match self.state() {
            PoolState::Constructed | PoolState::Stopped => {}
            _ => return Err(Error::AlreadyStarted),
        }
        let name = format!("{}-worker-{}", self.name, self.workers.len());
        self.workers
            .push(Worker::new(name, priorities.into_iter().collect())?);
        Ok(())
    }

    /// Spawn every worker and accept jobs.
    ///
    /// A second call without an intervening full stop fails with
    /// [`Error::AlreadyStarted`].
    pub fn start(&mut self) -> Result<()> {
        match self.state() {
            PoolState::Constructed => {}
            PoolState::Stopped => self.queue.reopen(),
            _ => return Err(Error::AlreadyStarted),
        }
        if self.workers.is_empty() {
            return Err(Error::NoWorkers);
        }

        for index in 0..self.workers.len() {
            if let Err(err) = {
                let (queue, metrics) = (self.queue.clone(), self.metrics.clone());
                self.workers[index].spawn(queue, metrics)
            } {
                // Roll back the workers already running
                log::error!("[{}] failed to spawn worker {}: {}", self.name, index, err);
                self.queue.stop();
                for worker in &mut self.workers[..index] {
                    worker.join();
                }
                self.queue.reopen();
                return Err(err);
            }
        }

        self.metrics
            .worker_threads
            .store(self.workers.len() as u64, Ordering::Relaxed);
        self.metrics.touch();
        self.set_state(PoolState::Started);
        log::info!("[{}] started {} workers", self.name, self.workers.len());
        Ok(())
    }

    /// Enqueue a job into its priority partition.
    pub fn enqueue<J>(&self, job: J) -> Result<()>
    where
        J: Job<P>,
    {
        self.enqueue_boxed(Box::new(job))
    }

    /// Enqueue an already-boxed job.
    pub fn enqueue_boxed(&self, job: Box<dyn Job<P>>) -> Result<()> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        self.queue.enqueue(job)?;
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .jobs_pending
            .store(self.queue.size() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Enqueue a closure with a priority.
    pub fn enqueue_fn<F>(&self, priority: P, callback: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.enqueue(CallbackJob::new(priority, callback))
    }

    /// Enqueue a batch of jobs; see [`PriorityQueue::enqueue_batch`].
    ///
    /// On a partial failure the already-enqueued prefix will still run
    /// and is accounted for in [`enqueued_count`](Self::enqueued_count).
    pub fn enqueue_batch(&self, jobs: Vec<Box<dyn Job<P>>>) -> Result<usize> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        let count = match self.queue.enqueue_batch(jobs) {
            Ok(count) => count,
            Err(err) => {
                // The prefix before the failing index stays queued
                if let Error::BatchEnqueue { index, .. } = &err {
                    self.enqueued.fetch_add(*index as u64, Ordering::Relaxed);
                }
                self.metrics
                    .jobs_pending
                    .store(self.queue.size() as u64, Ordering::Relaxed);
                return Err(err);
            }
        };
        self.enqueued.fetch_add(count as u64, Ordering::Relaxed);
        self.metrics
            .jobs_pending
            .store(self.queue.size() as u64, Ordering::Relaxed);
        Ok(count)
    }

    /// Stop the pool and join every worker.
    ///
    /// With `drain` set, the queue refuses new jobs while the backlog
    /// is processed to completion; otherwise workers finish only the
    /// job currently in hand. Blocks until every worker has stopped.
    /// Idempotent once stopped.
    pub fn stop(&mut self, drain: bool) {
        match self.state() {
            PoolState::Started => {}
            _ => return,
        }
        self.set_state(PoolState::Stopping);
        log::info!("[{}] stopping (drain: {})", self.name, drain);

        if drain {
            // Quiesce: refuse new jobs, let workers consume the backlog.
            // Only partitions some worker services can drain; jobs in an
            // unserviced partition stay queued.
            self.queue.close();
            let serviced: Vec<P> = self
                .workers
                .iter()
                .flat_map(|w| w.priorities().iter().copied())
                .collect::<std::collections::BTreeSet<P>>()
                .into_iter()
                .collect();
            while !self.queue.is_empty(&serviced) {
                std::thread::sleep(DRAIN_THROTTLE);
            }
        }
        self.queue.stop();

        // Join in creation order
        for worker in &mut self.workers {
            worker.join();
        }
        self.metrics
            .jobs_pending
            .store(self.queue.size() as u64, Ordering::Relaxed);
        self.metrics.touch();
        self.set_state(PoolState::Stopped);
        log::info!("[{}] stopped", self.name);
    }

    /// Total jobs accepted since construction.
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Number of workers currently executing a job.
    pub fn active_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| w.state() == WorkerState::Working)
            .count()
    }

    /// Number of jobs waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.queue.size()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn workers(&self) -> &[Worker<P>] {
        &self.workers
    }

    /// The pool's metric record, for collector registration.
    pub fn metrics(&self) -> Arc<ThreadPoolMetrics> {
        self.metrics.clone()
    }

    /// Every worker's metric record, in creation order.
    pub fn worker_metrics(&self) -> Vec<Arc<threadmill_mon::WorkerMetrics>> {
        self.workers.iter().map(|w| w.metrics()).collect()
    }
}

impl<P: Priority> Drop for ThreadPool<P> {
    fn drop(&mut self) {
        // Joining here keeps worker threads from outliving the pool
        self.stop(false);
    }
}

// =======================
// Tests
// =======================
