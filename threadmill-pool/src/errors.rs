//!
//! Crate errors
//!
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("The pool is already started")]
    AlreadyStarted,
    #[error("The pool is not started")]
    NotStarted,
    #[error("The queue is stopped")]
    Stopped,
    #[error("The pool is shutting down")]
    ShuttingDown,
    #[error("Failed to spawn worker thread")]
    WorkerSpawn(#[from] std::io::Error),
    #[error("The pool has no workers")]
    NoWorkers,
    #[error("Worker requires a non-empty priority set")]
    EmptyPriorities,
    #[error("Priority {0} is not registered with this pool")]
    UnknownPriority(String),
    #[error("Batch enqueue failed at index {index}: {source}")]
    BatchEnqueue {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("Job failed: {0}")]
    JobFailed(String),
    #[error("Missing or invalid config value {0}")]
    InvalidConfigValue(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for String {
    fn from(err: Error) -> String {
        format!("{}", err)
    }
}
