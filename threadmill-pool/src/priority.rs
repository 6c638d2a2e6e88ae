//!
//! Priority ordering for jobs and workers
//!
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Ordering key for job scheduling.
///
/// Lower values are scheduled first. The priority set of a pool is
/// fixed at construction; a worker's responsibility set is an ordered
/// list of these values, scanned first to last on each dequeue.
pub trait Priority: Copy + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Priority for T where T: Copy + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

/// Default three-level priority ladder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    High,
    #[default]
    Normal,
    Low,
}

impl JobPriority {
    /// Every priority, highest first.
    pub fn all() -> [JobPriority; 3] {
        [JobPriority::High, JobPriority::Normal, JobPriority::Low]
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPriority::High => write!(f, "high"),
            JobPriority::Normal => write!(f, "normal"),
            JobPriority::Low => write!(f, "low"),
        }
    }
}

// =======================
// Tests
// =======================
