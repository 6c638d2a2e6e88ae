use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize")]
pub(crate) struct BoundedUsize<const MIN: usize>(usize);

impl<const MIN: usize> fmt::Display for BoundedUsize<MIN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<const MIN: usize> TryFrom<usize> for BoundedUsize<MIN> {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value >= MIN {
            Ok(Self(value))
        } else {
            Err(Error::InvalidConfigValue(format!(
                "{} below minimum {}",
                value, MIN
            )))
        }
    }
}

impl<const MIN: usize> BoundedUsize<MIN> {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

const DEFAULT_COLLECTION_INTERVAL_MS: u64 = 100;
const DEFAULT_BUFFER_SIZE: usize = 3600;

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    /// Sleep between collection cycles, in milliseconds
    pub collection_interval_ms: u64,
    /// Snapshot history depth
    pub(crate) buffer_size: BoundedUsize<1>,
    /// Collect OS gauges into the system record
    pub enable_system_metrics: bool,
    /// Refresh the thread pool record timestamp
    pub enable_thread_pool_metrics: bool,
    /// Refresh the worker record timestamp
    pub enable_worker_metrics: bool,
    /// Skip platform reads entirely
    pub low_overhead_mode: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            collection_interval_ms: DEFAULT_COLLECTION_INTERVAL_MS,
            buffer_size: BoundedUsize(DEFAULT_BUFFER_SIZE),
            enable_system_metrics: true,
            enable_thread_pool_metrics: true,
            enable_worker_metrics: true,
            low_overhead_mode: false,
        }
    }
}

impl MonitorOptions {
    pub fn collection_interval(&self) -> Duration {
        Duration::from_millis(self.collection_interval_ms)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size.as_usize()
    }

    /// Set the collection interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.collection_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the snapshot history depth. Fails on zero.
    pub fn with_buffer_size(mut self, size: usize) -> Result<Self, Error> {
        self.buffer_size = size.try_into()?;
        Ok(self)
    }
}

// =======================
// Tests
// =======================
