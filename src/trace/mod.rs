//! Distributed trace context propagation.
//!
//! # Data Flow
//! ```text
//! inbound headers
//!     → resolver.rs (traceparent → B3 → fresh root)
//!     → TraceContext (context.rs)
//!     → decorator.rs (request view with X-Trace-Id, X-Span-Id, ...)
//!     → handler (opaque)
//!     → filter.rs finish (span.rs record, metrics counters, response headers)
//! ```
//!
//! # Design Decisions
//! - Supports W3C Trace Context and Zipkin B3 headers
//! - One inbound and one outbound hop; no exporter, no sampling policy
//! - Everything here is synchronous within the request; no I/O

pub mod context;
pub mod decorator;
pub mod filter;
pub mod resolver;
pub mod span;

pub use context::TraceContext;
pub use decorator::{InboundHeaders, TracedRequest};
pub use filter::{stamp_trace_headers, ActiveSpan, TracedError, TracingFilter};
pub use resolver::TraceResolver;
pub use span::SpanRecord;
