//!
//! Get stats for pool
//!
use crate::pool::ThreadPool;
use crate::priority::Priority;
use crate::worker::WorkerState;
use std::time::{Instant, SystemTime};

/// Point-in-time view of a pool.
///
/// Worker counts and queue depth are read at slightly different
/// moments; treat the whole record as approximate while the pool is
/// running.
pub struct PoolStats {
    workers: usize,
    active: usize,
    idle: usize,
    queue_depth: usize,
    enqueued: u64,
    jobs_completed: u64,
    jobs_failed: u64,
    instant: Instant,
}

impl PoolStats {
    pub fn new<P: Priority>(pool: &ThreadPool<P>) -> Self {
        let workers = pool.worker_count();
        let active = pool.active_workers();
        let idle = pool
            .workers()
            .iter()
            .filter(|w| w.state() == WorkerState::Waiting)
            .count();
        let jobs_failed = pool
            .worker_metrics()
            .iter()
            .map(|m| m.sample().jobs_failed)
            .sum();
        Self {
            workers,
            active,
            idle,
            queue_depth: pool.queue_depth(),
            enqueued: pool.enqueued_count(),
            jobs_completed: pool.metrics().sample().jobs_completed,
            jobs_failed,
            instant: Instant::now(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn active_workers(&self) -> usize {
        self.active
    }
    pub fn idle_workers(&self) -> usize {
        self.idle
    }
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }
    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed
    }
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed
    }

    /// Returns the measurement of the worker activity as
    /// `active / (active + idle)`.
    pub fn activity(&self) -> Option<f64> {
        let b = self.active + self.idle;
        if b > 0 {
            Some(self.active as f64 / b as f64)
        } else {
            None
        }
    }

    /// Return a system time timestamp relative
    /// to the instant of the measurement
    pub fn timestamp(&self) -> Option<SystemTime> {
        SystemTime::now().checked_sub(self.instant.elapsed())
    }
}

// =======================
// Tests
// =======================
