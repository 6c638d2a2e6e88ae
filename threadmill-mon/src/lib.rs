//!
//! Asynchronous performance monitoring for the threadmill runtime
//!
//! A collector thread samples shared metric records at a fixed interval
//! and retains snapshots in a bounded ring buffer.
//!
pub mod collector;
pub mod config;
pub mod errors;
pub mod global;
pub mod metrics;
pub mod ring;

pub(crate) mod platform;

// reexport
pub use collector::{CollectionStatsSample, MetricsCollector};
pub use config::MonitorOptions;
pub use errors::{Error, Result};
pub use global::{collection_stats, collector, current, is_active, recent, start_global, stop_global};
pub use metrics::{
    MetricsSnapshot, ScopedTimer, SystemMetrics, SystemSample, ThreadPoolMetrics, ThreadPoolSample,
    WorkerMetrics, WorkerSample,
};
pub use ring::{RingBuffer, SharedRingBuffer};

#[cfg(test)]
mod tests;
