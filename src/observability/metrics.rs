//! Request counters and metrics exposition.
//!
//! # Responsibilities
//! - Count requests, failures and cumulative request time
//! - Render the Prometheus-compatible text document served on `/metrics`
//!
//! # Metrics
//! - `http_requests_total` (counter): every traced request
//! - `http_errors_total` (counter): requests whose handler failed
//! - `http_request_duration_seconds_total` (counter): summed request time
//! - process memory, thread, GC, uptime and CPU families from [`ProcessStats`]
//!
//! # Design Decisions
//! - One atomic per counter, no cross-counter consistency
//! - Counters only grow; nothing resets them
//! - The registry is an explicit value shared by `Arc`, not a global

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::ServiceSettings;
use crate::observability::process::ProcessStats;

/// Content type of the exposition document.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Process-wide request counters.
#[derive(Debug)]
pub struct MetricsRegistry {
    request_count: AtomicU64,
    error_count: AtomicU64,
    duration_total_ms: AtomicU64,
    started_at: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub error_count: u64,
    pub duration_total_ms: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            duration_total_ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_duration(&self, duration_ms: u64) {
        self.duration_total_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn duration_total_ms(&self) -> u64 {
        self.duration_total_ms.load(Ordering::Relaxed)
    }

    /// Time since the registry was created. The binary creates it first thing,
    /// so this is process uptime.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            request_count: self.request_count(),
            error_count: self.error_count(),
            duration_total_ms: self.duration_total_ms(),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `# HELP` / `# TYPE` block.
struct Exposition {
    out: String,
}

impl Exposition {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn family(&mut self, name: &str, help: &str, kind: &str) -> &mut Self {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let _ = writeln!(self.out, "# HELP {} {}", name, help);
        let _ = writeln!(self.out, "# TYPE {} {}", name, kind);
        self
    }

    fn sample(&mut self, name: &str, labels: &[(&str, &str)], value: impl std::fmt::Display) -> &mut Self {
        self.out.push_str(name);
        if !labels.is_empty() {
            self.out.push('{');
            for (i, (key, val)) in labels.iter().enumerate() {
                if i > 0 {
                    self.out.push(',');
                }
                let _ = write!(self.out, "{}=\"{}\"", key, escape_label(val));
            }
            self.out.push('}');
        }
        let _ = writeln!(self.out, " {}", value);
        self
    }

    fn finish(self) -> String {
        self.out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Milliseconds rendered as seconds with three decimals.
fn seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Render the full exposition document from live values.
pub fn render_exposition(
    service: &ServiceSettings,
    counters: &MetricsSnapshot,
    process: &ProcessStats,
) -> String {
    let svc = service.name.as_str();
    let mut doc = Exposition::new();

    doc.family("was_info", "Service information", "gauge").sample(
        "was_info",
        &[("service", svc), ("type", service.kind.as_str()), ("runtime", service.runtime.as_str())],
        1,
    );

    doc.family("process_memory_bytes_used", "Process memory used", "gauge")
        .sample("process_memory_bytes_used", &[("area", "resident")], process.resident_memory_bytes)
        .sample("process_memory_bytes_used", &[("area", "virtual")], process.virtual_memory_bytes);

    doc.family("process_memory_bytes_max", "Memory available to the process", "gauge")
        .sample("process_memory_bytes_max", &[("area", "system")], process.total_memory_bytes);

    doc.family("process_threads_current", "Current thread count", "gauge")
        .sample("process_threads_current", &[], process.threads);
    doc.family("process_threads_peak", "Peak thread count", "gauge")
        .sample("process_threads_peak", &[], process.peak_threads);
    doc.family("runtime_workers", "Async runtime worker threads", "gauge")
        .sample("runtime_workers", &[], process.runtime_workers);

    doc.family("process_gc_collection_seconds_total", "Total GC collection time", "counter");
    for gc in &process.collectors {
        doc.sample("process_gc_collection_seconds_total", &[("gc", gc.name.as_str())], seconds(gc.time_ms));
    }
    doc.family("process_gc_collection_count_total", "Total GC collection count", "counter");
    for gc in &process.collectors {
        doc.sample("process_gc_collection_count_total", &[("gc", gc.name.as_str())], gc.count);
    }

    doc.family("http_requests_total", "Total HTTP requests", "counter")
        .sample("http_requests_total", &[("service", svc)], counters.request_count);
    doc.family("http_errors_total", "Total HTTP errors", "counter")
        .sample("http_errors_total", &[("service", svc)], counters.error_count);
    doc.family("http_request_duration_seconds_total", "Total request duration", "counter")
        .sample(
            "http_request_duration_seconds_total",
            &[("service", svc)],
            seconds(counters.duration_total_ms),
        );

    doc.family("process_uptime_seconds", "Process uptime in seconds", "gauge")
        .sample("process_uptime_seconds", &[], seconds(process.uptime_ms));
    doc.family("process_cpu_available", "Available processors", "gauge")
        .sample("process_cpu_available", &[], process.available_processors);

    doc.finish()
}
