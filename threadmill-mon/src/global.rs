//!
//! Process-wide monitoring facade
//!
//! Wraps a single collector behind an explicit initialize/shutdown
//! lifecycle. Reads against an uninitialized facade return empty
//! defaults rather than errors.
//!
use crate::collector::{CollectionStatsSample, MetricsCollector};
use crate::config::MonitorOptions;
use crate::errors::{Error, Result};
use crate::metrics::MetricsSnapshot;
use parking_lot::Mutex;
use std::sync::Arc;

static GLOBAL: Mutex<Option<Arc<MetricsCollector>>> = Mutex::new(None);

/// Initialize the global collector and start it.
///
/// Fails with [`Error::AlreadyInitialized`] when called twice without
/// an intervening [`stop_global`].
pub fn start_global(options: MonitorOptions) -> Result<()> {
    let mut slot = GLOBAL.lock();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    let collector = Arc::new(MetricsCollector::new(options));
    collector.start()?;
    *slot = Some(collector);
    Ok(())
}

/// Stop and discard the global collector. Safe when uninitialized.
pub fn stop_global() {
    if let Some(collector) = GLOBAL.lock().take() {
        collector.stop();
    }
}

/// The global collector, when initialized.
pub fn collector() -> Option<Arc<MetricsCollector>> {
    GLOBAL.lock().clone()
}

/// True while the global collector is running.
pub fn is_active() -> bool {
    collector().map(|c| c.is_running()).unwrap_or(false)
}

/// Value copy of the registered records; empty default when the facade
/// is uninitialized.
pub fn current() -> MetricsSnapshot {
    collector()
        .map(|c| c.current_snapshot())
        .unwrap_or_default()
}

/// Up to `count` historical snapshots, oldest first.
pub fn recent(count: usize) -> Vec<MetricsSnapshot> {
    collector()
        .map(|c| c.recent_snapshots(count))
        .unwrap_or_default()
}

/// The global collector's activity counters.
pub fn collection_stats() -> CollectionStatsSample {
    collector()
        .map(|c| c.collection_stats())
        .unwrap_or_default()
}

// =======================
// Tests
// =======================
