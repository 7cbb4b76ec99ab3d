//! Trace context value type and identifier generation.

use rand::Rng;

/// W3C Trace Context header.
pub const TRACEPARENT: &str = "traceparent";

/// Zipkin B3 multi-header propagation.
pub const B3_TRACE_ID: &str = "x-b3-traceid";
pub const B3_SPAN_ID: &str = "x-b3-spanid";
pub const B3_SAMPLED: &str = "x-b3-sampled";

/// Headers synthesized for downstream handlers and stamped on responses.
pub const X_TRACE_ID: &str = "x-trace-id";
pub const X_SPAN_ID: &str = "x-span-id";
pub const X_PARENT_SPAN_ID: &str = "x-parent-span-id";
pub const X_SERVICE: &str = "x-service";

/// Trace identity of one inbound request.
///
/// Built once by the resolver and owned by the request invocation.
/// Fields are read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: String,
    span_id: String,
    parent_span_id: Option<String>,
    service_name: String,
    sampled: bool,
}

impl TraceContext {
    pub(crate) fn new(
        trace_id: String,
        parent_span_id: Option<String>,
        service_name: impl Into<String>,
        sampled: bool,
    ) -> Self {
        Self {
            trace_id,
            span_id: generate_span_id(),
            parent_span_id,
            service_name: service_name.into(),
            sampled,
        }
    }

    /// Start a fresh root trace.
    pub fn root(service_name: impl Into<String>) -> Self {
        Self::new(generate_trace_id(), None, service_name, true)
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn parent_span_id(&self) -> Option<&str> {
        self.parent_span_id.as_deref()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Headers announcing this context to downstream handlers.
    ///
    /// `X-Parent-Span-Id` is only present when the request had an upstream parent.
    pub fn synthesized_headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![(X_TRACE_ID, self.trace_id()), (X_SPAN_ID, self.span_id())];
        if let Some(parent) = self.parent_span_id() {
            headers.push((X_PARENT_SPAN_ID, parent));
        }
        headers.push((X_SERVICE, self.service_name()));
        headers
    }
}

/// Generate a 128-bit trace ID as 32 lowercase hex characters.
pub fn generate_trace_id() -> String {
    let id: u128 = rand::thread_rng().gen();
    format!("{:032x}", id)
}

/// Generate a 64-bit span ID as 16 lowercase hex characters.
pub fn generate_span_id() -> String {
    let id: u64 = rand::thread_rng().gen();
    format!("{:016x}", id)
}
