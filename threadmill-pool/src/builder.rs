//! Pool builder
use crate::config::PoolOptions;
use crate::errors::Result;
use crate::pool::ThreadPool;
use crate::priority::{JobPriority, Priority};

/// Builder
///
/// Declares the priority set and the worker provisioning of a pool
/// before it is constructed.
pub struct Builder<P: Priority> {
    name: String,
    priorities: Vec<P>,
    workers: Vec<Vec<P>>,
}

impl Default for Builder<JobPriority> {
    fn default() -> Self {
        Self::new(JobPriority::all())
    }
}

impl<P: Priority> Builder<P> {
    /// Create a builder over the given priority set
    pub fn new<I>(priorities: I) -> Self
    where
        I: IntoIterator<Item = P>,
    {
        Self {
            name: "threadmill".into(),
            priorities: priorities.into_iter().collect(),
            workers: Vec::new(),
        }
    }

    pub fn name(&mut self, value: &str) -> &mut Self {
        self.name = value.to_string();
        self
    }

    /// Declare one worker servicing the given priorities, in order
    pub fn worker<I>(&mut self, priorities: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
    {
        self.workers.push(priorities.into_iter().collect());
        self
    }

    /// Declare `count` workers sharing the same responsibility set
    pub fn workers<I>(&mut self, count: usize, priorities: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
    {
        let set: Vec<P> = priorities.into_iter().collect();
        for _ in 0..count {
            self.workers.push(set.clone());
        }
        self
    }

    /// Construct the pool without starting it
    pub fn build(&self) -> Result<ThreadPool<P>> {
        let mut pool = ThreadPool::named(&self.name, self.priorities.iter().copied());
        for set in &self.workers {
            pool.add_worker(set.iter().copied())?;
        }
        Ok(pool)
    }

    /// Construct the pool and start its workers
    pub fn start(&self) -> Result<ThreadPool<P>> {
        let mut pool = self.build()?;
        pool.start()?;
        Ok(pool)
    }
}

impl Builder<JobPriority> {
    /// Provision workers from configuration: dedicated workers service
    /// a single priority, general workers service the whole ladder.
    pub fn from_options(opts: &PoolOptions) -> Self {
        let mut builder = Self::new(JobPriority::all());
        builder.name(&opts.name);
        builder.workers(opts.dedicated_high, [JobPriority::High]);
        builder.workers(opts.dedicated_normal, [JobPriority::Normal]);
        builder.workers(opts.dedicated_low, [JobPriority::Low]);
        builder.workers(opts.general_workers, JobPriority::all());
        builder
    }
}

// =======================
// Tests
// =======================
