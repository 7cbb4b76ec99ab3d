//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every traced request produces:
//!     → trace::span (one [SPAN] log line)
//!     → metrics.rs (request / error / duration counters)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → GET /metrics (metrics.rs counters + process.rs live sample)
//! ```
//!
//! # Design Decisions
//! - Counters are plain atomics owned by an explicit registry
//! - Process stats are sampled per scrape, never cached

pub mod logging;
pub mod metrics;
pub mod process;

pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use process::{ProcessProbe, ProcessStats};
