//!
//! Unit of work
//!
use crate::errors::Result;
use crate::priority::Priority;

/// A unit of work executed on a pool worker.
///
/// `run` consumes the job, so it is invoked at most once, on a single
/// worker thread. Returning an error does not terminate the worker; the
/// failure is counted in the worker's metrics and logged.
pub trait Job<P: Priority>: Send + 'static {
    /// The partition this job is enqueued into.
    fn priority(&self) -> P;

    /// Execute the work synchronously.
    fn run(self: Box<Self>) -> Result<()>;

    /// Diagnostic label used in logs.
    fn name(&self) -> &str {
        "job"
    }
}

/// Closure-backed job.
pub struct CallbackJob<P, F> {
    priority: P,
    name: String,
    callback: F,
}

impl<P, F> CallbackJob<P, F>
where
    P: Priority,
    F: FnOnce() -> Result<()> + Send + 'static,
{
    pub fn new(priority: P, callback: F) -> Self {
        Self {
            priority,
            name: "callback".into(),
            callback,
        }
    }

    /// Attach a diagnostic label
    pub fn named(name: &str, priority: P, callback: F) -> Self {
        Self {
            priority,
            name: name.into(),
            callback,
        }
    }
}

impl<P, F> Job<P> for CallbackJob<P, F>
where
    P: Priority,
    F: FnOnce() -> Result<()> + Send + 'static,
{
    fn priority(&self) -> P {
        self.priority
    }

    fn run(self: Box<Self>) -> Result<()> {
        (self.callback)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =======================
// Tests
// =======================
