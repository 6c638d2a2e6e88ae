//!
//! Crate errors
//!
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Collector is already running")]
    AlreadyRunning,
    #[error("Global monitor is already initialized")]
    AlreadyInitialized,
    #[error("Failed to spawn the collection thread")]
    CollectorSpawn(#[from] std::io::Error),
    #[error("Platform metrics read failed: {0}")]
    PlatformRead(String),
    #[error("Missing or invalid config value {0}")]
    InvalidConfigValue(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for String {
    fn from(err: Error) -> String {
        format!("{}", err)
    }
}
