//!
//! Priority-partitioned job queue
//!
//! One FIFO partition per priority value, guarded by a single mutex and
//! condition variable. Workers block in `dequeue` with a priority
//! filter; `stop` wakes every waiter with a bounded latency.
//!
use crate::errors::{Error, Result};
use crate::job::Job;
use crate::priority::Priority;
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Queue lifecycle.
///
/// `Closing` is the drain phase: enqueues are refused while workers
/// keep consuming the backlog. `Stopped` additionally wakes blocked
/// waiters once their partitions are empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueState {
    Open,
    Closing,
    Stopped,
}

struct Partitions<P: Priority> {
    jobs: BTreeMap<P, VecDeque<Box<dyn Job<P>>>>,
    state: QueueState,
}

impl<P: Priority> Partitions<P> {
    // Pop from the first non-empty requested partition
    fn take_first(&mut self, priorities: &[P]) -> Option<Box<dyn Job<P>>> {
        priorities
            .iter()
            .find_map(|p| self.jobs.get_mut(p).and_then(|partition| partition.pop_front()))
    }

    fn push(&mut self, job: Box<dyn Job<P>>) -> Result<()> {
        match self.state {
            QueueState::Open => {}
            QueueState::Closing => return Err(Error::ShuttingDown),
            QueueState::Stopped => return Err(Error::Stopped),
        }
        let priority = job.priority();
        let Some(partition) = self.jobs.get_mut(&priority) else {
            return Err(Error::UnknownPriority(format!("{:?}", priority)));
        };
        partition.push_back(job);
        Ok(())
    }
}

pub struct PriorityQueue<P: Priority> {
    inner: Mutex<Partitions<P>>,
    available: Condvar,
    count: AtomicUsize,
}

impl<P: Priority> PriorityQueue<P> {
    /// Create a queue with one partition per given priority.
    ///
    /// The partition set is fixed for the lifetime of the queue.
    pub fn new<I>(priorities: I) -> Self
    where
        I: IntoIterator<Item = P>,
    {
        Self {
            inner: Mutex::new(Partitions {
                jobs: priorities.into_iter().map(|p| (p, VecDeque::new())).collect(),
                state: QueueState::Open,
            }),
            available: Condvar::new(),
            count: AtomicUsize::new(0),
        }
    }

    /// Enqueue a job into its priority partition.
    pub fn enqueue(&self, job: Box<dyn Job<P>>) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            inner.push(job)?;
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        // Waiters filter by priority, so a single wake could land on a
        // worker that does not service this partition and strand the
        // job; broadcast so an eligible waiter wakes.
        self.available.notify_all();
        Ok(())
    }

    /// Enqueue a batch of jobs; returns the number enqueued.
    ///
    /// On failure the already-enqueued prefix stays in the queue and
    /// the error carries the index of the failing job.
    pub fn enqueue_batch(&self, jobs: Vec<Box<dyn Job<P>>>) -> Result<usize> {
        let total = jobs.len();
        {
            let mut inner = self.inner.lock();
            for (index, job) in jobs.into_iter().enumerate() {
                if let Err(err) = inner.push(job) {
                    self.count.fetch_add(index, Ordering::Relaxed);
                    if index > 0 {
                        self.available.notify_all();
                    }
                    return Err(Error::BatchEnqueue {
                        index,
                        source: Box::new(err),
                    });
                }
            }
            self.count.fetch_add(total, Ordering::Relaxed);
        }
        self.available.notify_all();
        Ok(total)
    }

    /// Wait for a job in any of the given partitions, scanned in order.
    ///
    /// Returns `Err(Stopped)` once the queue is stopped and every
    /// matching partition is drained.
    pub fn dequeue(&self, priorities: &[P]) -> Result<Box<dyn Job<P>>> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(job) = inner.take_first(priorities) {
                self.count.fetch_sub(1, Ordering::Relaxed);
                return Ok(job);
            }
            if inner.state == QueueState::Stopped {
                return Err(Error::Stopped);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Non-blocking variant of [`dequeue`](Self::dequeue).
    pub fn try_dequeue(&self, priorities: &[P]) -> Option<Box<dyn Job<P>>> {
        let job = self.inner.lock().take_first(priorities);
        if job.is_some() {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
        job
    }

    /// Enter the drain phase: refuse new jobs, keep serving dequeues.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.state == QueueState::Open {
            inner.state = QueueState::Closing;
        }
    }

    /// Stop the queue and wake every waiter.
    ///
    /// Jobs still enqueued remain dequeuable; blocked waiters whose
    /// partitions are empty observe `Err(Stopped)`.
    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock();
            inner.state = QueueState::Stopped;
        }
        self.available.notify_all();
    }

    // Accept jobs again after a full stop. Leftover jobs are kept.
    pub(crate) fn reopen(&self) {
        let mut inner = self.inner.lock();
        inner.state = QueueState::Open;
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().state == QueueState::Stopped
    }

    /// Total number of queued jobs across partitions.
    pub fn size(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Number of queued jobs for one priority.
    pub fn size_of(&self, priority: P) -> usize {
        self.inner
            .lock()
            .jobs
            .get(&priority)
            .map(|partition| partition.len())
            .unwrap_or(0)
    }

    /// Returns `true` if every given partition is empty.
    pub fn is_empty(&self, priorities: &[P]) -> bool {
        let inner = self.inner.lock();
        priorities
            .iter()
            .all(|p| inner.jobs.get(p).map(|partition| partition.is_empty()).unwrap_or(true))
    }
}

// =======================
// Tests
// =======================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::CallbackJob;
    use crate::priority::JobPriority;
    use crate::tests::setup;
    use std::sync::Arc;
    use std::time::Duration;

    fn job(priority: JobPriority) -> Box<dyn Job<JobPriority>> {
        Box::new(CallbackJob::new(priority, || Ok(())))
    }

    fn queue() -> PriorityQueue<JobPriority> {
        PriorityQueue::new(JobPriority::all())
    }

    #[test]
    fn test_fifo_within_priority() {
        setup();

        let q = queue();
        for i in 0..5 {
            q.enqueue(Box::new(CallbackJob::named(
                &format!("job-{}", i),
                JobPriority::Normal,
                || Ok(()),
            )))
            .unwrap();
        }
        for i in 0..5 {
            let job = q.dequeue(&JobPriority::all()).unwrap();
            assert_eq!(job.name(), format!("job-{}", i));
        }
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn test_priority_scan_order() {
        setup();

        let q = queue();
        q.enqueue(job(JobPriority::Low)).unwrap();
        q.enqueue(job(JobPriority::Normal)).unwrap();
        q.enqueue(job(JobPriority::High)).unwrap();

        let order = [JobPriority::High, JobPriority::Normal, JobPriority::Low];
        for expected in order {
            let job = q.dequeue(&order).unwrap();
            assert_eq!(job.priority(), expected);
        }
    }

    #[test]
    fn test_dequeue_respects_filter() {
        setup();

        let q = queue();
        q.enqueue(job(JobPriority::High)).unwrap();
        q.enqueue(job(JobPriority::Low)).unwrap();

        // A low-only consumer never sees the high job
        let job = q.try_dequeue(&[JobPriority::Low]).unwrap();
        assert_eq!(job.priority(), JobPriority::Low);
        assert_eq!(q.size_of(JobPriority::High), 1);
        assert!(q.try_dequeue(&[JobPriority::Low]).is_none());
    }

    #[test]
    fn test_enqueue_after_stop() {
        setup();

        let q = queue();
        q.enqueue(job(JobPriority::Normal)).unwrap();
        q.stop();

        assert!(matches!(
            q.enqueue(job(JobPriority::Normal)),
            Err(Error::Stopped)
        ));
        // Leftover job is still served, then Stopped
        assert!(q.dequeue(&JobPriority::all()).is_ok());
        assert!(matches!(
            q.dequeue(&JobPriority::all()),
            Err(Error::Stopped)
        ));
    }

    #[test]
    fn test_enqueue_while_closing() {
        setup();

        let q = queue();
        q.enqueue(job(JobPriority::Normal)).unwrap();
        q.close();
        assert!(matches!(
            q.enqueue(job(JobPriority::Normal)),
            Err(Error::ShuttingDown)
        ));
        // Drain continues during the drain phase
        assert!(q.dequeue(&JobPriority::all()).is_ok());
    }

    #[test]
    fn test_unknown_priority() {
        setup();

        let q = PriorityQueue::new([JobPriority::High]);
        assert!(matches!(
            q.enqueue(job(JobPriority::Low)),
            Err(Error::UnknownPriority(_))
        ));
    }

    #[test]
    fn test_batch_enqueue() {
        setup();

        let q = queue();
        let jobs: Vec<Box<dyn Job<JobPriority>>> =
            vec![job(JobPriority::High), job(JobPriority::Low)];
        assert_eq!(q.enqueue_batch(jobs).unwrap(), 2);
        assert_eq!(q.size(), 2);
    }

    #[test]
    fn test_batch_enqueue_partial_failure() {
        setup();

        let q = PriorityQueue::new([JobPriority::High, JobPriority::Normal]);
        let jobs: Vec<Box<dyn Job<JobPriority>>> = vec![
            job(JobPriority::High),
            job(JobPriority::Normal),
            job(JobPriority::Low), // not a partition of this queue
            job(JobPriority::High),
        ];
        match q.enqueue_batch(jobs) {
            Err(Error::BatchEnqueue { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        // The prefix survived
        assert_eq!(q.size(), 2);
    }

    #[test]
    fn test_stop_wakes_blocked_dequeue() {
        setup();

        let q = Arc::new(queue());
        let waiter = {
            let q = q.clone();
            std::thread::spawn(move || q.dequeue(&JobPriority::all()))
        };
        // Let the waiter block
        std::thread::sleep(Duration::from_millis(20));
        q.stop();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(Error::Stopped)));
    }

    #[test]
    fn test_enqueue_wakes_blocked_dequeue() {
        setup();

        let q = Arc::new(queue());
        let waiter = {
            let q = q.clone();
            std::thread::spawn(move || q.dequeue(&[JobPriority::High]))
        };
        std::thread::sleep(Duration::from_millis(20));
        q.enqueue(job(JobPriority::High)).unwrap();

        let job = waiter.join().unwrap().unwrap();
        assert_eq!(job.priority(), JobPriority::High);
    }

    #[test]
    fn test_jobs_remain_without_consumers() {
        setup();

        let q = queue();
        for _ in 0..3 {
            q.enqueue(job(JobPriority::Normal)).unwrap();
        }
        assert_eq!(q.size(), 3);
        assert!(!q.is_empty(&[JobPriority::Normal]));
        assert!(q.is_empty(&[JobPriority::High, JobPriority::Low]));

        // A consumer arriving later still gets everything
        for _ in 0..3 {
            assert!(q.try_dequeue(&JobPriority::all()).is_some());
        }
        assert_eq!(q.size(), 0);
    }
}
