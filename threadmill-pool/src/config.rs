use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::logger::Logging;

const DEFAULT_GENERAL_WORKERS: usize = 4;

/// Pool provisioning over the default priority ladder
///
/// Dedicated workers service a single priority; general workers
/// service every priority, highest first. Keeping at least one general
/// or dedicated-low worker prevents starvation of the ladder's tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Name of the pool instance
    pub name: String,
    /// Workers servicing only high priority jobs
    pub dedicated_high: usize,
    /// Workers servicing only normal priority jobs
    pub dedicated_normal: usize,
    /// Workers servicing only low priority jobs
    pub dedicated_low: usize,
    /// Workers servicing the whole ladder
    pub general_workers: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            name: "threadmill".to_string(),
            dedicated_high: 0,
            dedicated_normal: 0,
            dedicated_low: 0,
            general_workers: DEFAULT_GENERAL_WORKERS,
        }
    }
}

impl PoolOptions {
    pub fn worker_count(&self) -> usize {
        self.dedicated_high + self.dedicated_normal + self.dedicated_low + self.general_workers
    }
}

//
// Global settings
//
use config::{
    builder::{ConfigBuilder, DefaultState},
    Config, ConfigError, Environment,
};

#[derive(Default, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: Logging,
    pub pool: PoolOptions,
    pub monitor: threadmill_mon::MonitorOptions,
}

impl Settings {
    pub fn init_logger(&self) {
        self.logging.init()
    }

    /// Configure so environment will be as CONF_KEY__VALUE
    fn build(settings: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let s = settings
            .add_source(
                Environment::with_prefix("conf")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Create from default and environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::build(Config::builder())
    }

    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(config::File::from(path)))
    }
}

// =======================
// Tests
// =======================
