//!
//! Platform probes for the system record
//!
//! Probe failures are reported to the caller and counted as collection
//! errors; they never reach user code.
//!
use crate::errors::{Error, Result};

/// One-shot readout of the platform gauges.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemProbe {
    pub memory_usage_bytes: Option<u64>,
    pub active_threads: Option<u64>,
}

fn hardware_threads() -> Option<u64> {
    std::thread::available_parallelism()
        .ok()
        .map(|n| n.get() as u64)
}

#[cfg(target_os = "linux")]
pub(crate) fn probe() -> Result<SystemProbe> {
    use procfs::{Current, Meminfo};

    let meminfo = Meminfo::current().map_err(|err| Error::PlatformRead(err.to_string()))?;
    let available = meminfo.mem_available.unwrap_or(meminfo.mem_free);
    let memory_usage_bytes = meminfo.mem_total.checked_sub(available);

    // Per-process thread count; hardware concurrency when /proc/self
    // is not readable
    let active_threads = procfs::process::Process::myself()
        .and_then(|process| process.stat())
        .ok()
        .map(|stat| stat.num_threads as u64)
        .or_else(hardware_threads);

    Ok(SystemProbe {
        memory_usage_bytes,
        active_threads,
    })
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn probe() -> Result<SystemProbe> {
    Ok(SystemProbe {
        memory_usage_bytes: None,
        active_threads: hardware_threads(),
    })
}

// =======================
// Tests
// =======================
