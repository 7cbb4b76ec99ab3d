//! Live process introspection for health and metrics.
//!
//! Values are sampled on every call; nothing here is cached between scrapes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use sysinfo::{Pid, System};

/// Collection statistics for one garbage collector.
///
/// The process has no tracing collector, so a single `none` series is
/// reported to keep the exposition families stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorStats {
    pub name: String,
    pub count: u64,
    pub time_ms: u64,
}

impl CollectorStats {
    pub fn none() -> Self {
        Self {
            name: "none".to_string(),
            count: 0,
            time_ms: 0,
        }
    }
}

/// One sample of process state.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStats {
    pub resident_memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    pub total_memory_bytes: u64,
    pub threads: u64,
    pub peak_threads: u64,
    pub runtime_workers: u64,
    pub collectors: Vec<CollectorStats>,
    pub uptime_ms: u64,
    pub available_processors: u64,
}

impl Default for ProcessStats {
    fn default() -> Self {
        Self {
            resident_memory_bytes: 0,
            virtual_memory_bytes: 0,
            total_memory_bytes: 0,
            threads: 0,
            peak_threads: 0,
            runtime_workers: 0,
            collectors: vec![CollectorStats::none()],
            uptime_ms: 0,
            available_processors: available_processors(),
        }
    }
}

/// Samples memory and thread usage of the current process.
#[derive(Clone)]
pub struct ProcessProbe {
    system: Arc<Mutex<System>>,
    pid: Pid,
    peak_threads: Arc<AtomicU64>,
}

impl ProcessProbe {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            pid: Pid::from_u32(std::process::id()),
            peak_threads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sample on the blocking pool; the refresh reads `/proc` synchronously.
    pub async fn sample(&self, uptime: Duration) -> ProcessStats {
        let probe = self.clone();
        let runtime_workers = runtime_workers();

        match tokio::task::spawn_blocking(move || probe.sample_blocking(uptime)).await {
            Ok(mut stats) => {
                stats.runtime_workers = runtime_workers;
                stats
            }
            Err(e) => {
                tracing::warn!(error = %e, "Process sampling task failed");
                ProcessStats {
                    uptime_ms: uptime.as_millis() as u64,
                    runtime_workers,
                    ..ProcessStats::default()
                }
            }
        }
    }

    pub fn sample_blocking(&self, uptime: Duration) -> ProcessStats {
        let mut sys = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sys.refresh_all();

        let (resident, virt, threads) = sys
            .process(self.pid)
            .map(|p| {
                let threads = p.tasks().map(|t| t.len() as u64).unwrap_or(1).max(1);
                (p.memory(), p.virtual_memory(), threads)
            })
            .unwrap_or((0, 0, 0));

        let peak = self.peak_threads.fetch_max(threads, Ordering::Relaxed).max(threads);

        ProcessStats {
            resident_memory_bytes: resident,
            virtual_memory_bytes: virt,
            total_memory_bytes: sys.total_memory(),
            threads,
            peak_threads: peak,
            runtime_workers: runtime_workers(),
            collectors: vec![CollectorStats::none()],
            uptime_ms: uptime.as_millis() as u64,
            available_processors: available_processors(),
        }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn available_processors() -> u64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u64)
        .unwrap_or(1)
}

fn runtime_workers() -> u64 {
    tokio::runtime::Handle::try_current()
        .map(|h| h.metrics().num_workers() as u64)
        .unwrap_or(0)
}
