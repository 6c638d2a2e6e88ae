//!
//! Worker-affinity priority thread pool
//!
//! Jobs are enqueued into per-priority FIFO partitions; each worker
//! thread services an ordered subset of the priorities. Shutdown is
//! cooperative, with optional draining of the backlog. The pool and
//! its workers publish their activity through the `threadmill-mon`
//! metric records.
//!
pub mod builder;
pub mod config;
pub mod errors;
pub mod job;
pub mod logger;
pub mod pool;
pub mod priority;
pub mod queue;
pub mod stats;
pub mod worker;

// reexport
pub use builder::Builder;
pub use config::{PoolOptions, Settings};
pub use errors::{Error, Result};
pub use job::{CallbackJob, Job};
pub use pool::{PoolState, ThreadPool};
pub use priority::{JobPriority, Priority};
pub use queue::PriorityQueue;
pub use stats::PoolStats;
pub use worker::{Worker, WorkerState};

#[cfg(test)]
mod tests;
