//! Span records emitted once per request.

use std::fmt;

use crate::trace::context::TraceContext;

/// One finished request, rendered as a single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub service_name: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
}

impl SpanRecord {
    pub fn new(
        context: &TraceContext,
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        duration_ms: u64,
    ) -> Self {
        Self {
            trace_id: context.trace_id().to_string(),
            span_id: context.span_id().to_string(),
            parent_span_id: context.parent_span_id().map(str::to_string),
            service_name: context.service_name().to_string(),
            method: method.into(),
            path: path.into(),
            status,
            duration_ms,
        }
    }

    /// Write the record to the `span` log target.
    pub fn emit(&self) {
        tracing::info!(
            target: "span",
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            status = self.status,
            duration_ms = self.duration_ms,
            "{}",
            self
        );
    }
}

/// `[SPAN] traceId=.. spanId=.. parentSpanId=..|root service=.. method=.. path=.. status=.. duration=..ms`
impl fmt::Display for SpanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[SPAN] traceId={} spanId={} parentSpanId={} service={} method={} path={} status={} duration={}ms",
            self.trace_id,
            self.span_id,
            self.parent_span_id.as_deref().unwrap_or("root"),
            self.service_name,
            self.method,
            self.path,
            self.status,
            self.duration_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(parent: Option<&str>) -> SpanRecord {
        SpanRecord {
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".into(),
            span_id: "53ce929d0e0e4736".into(),
            parent_span_id: parent.map(str::to_string),
            service_name: "was-9-rust".into(),
            method: "GET".into(),
            path: "/api/info".into(),
            status: 200,
            duration_ms: 12,
        }
    }

    #[test]
    fn test_root_rendering() {
        assert_eq!(
            record(None).to_string(),
            "[SPAN] traceId=4bf92f3577b34da6a3ce929d0e0e4736 spanId=53ce929d0e0e4736 \
             parentSpanId=root service=was-9-rust method=GET path=/api/info status=200 duration=12ms"
        );
    }

    #[test]
    fn test_child_rendering() {
        let line = record(Some("00f067aa0ba902b7")).to_string();
        assert!(line.contains(" parentSpanId=00f067aa0ba902b7 "));
        assert!(line.ends_with("status=200 duration=12ms"));
    }

    #[test]
    fn test_from_context() {
        let ctx = TraceContext::root("svc");
        let rec = SpanRecord::new(&ctx, "POST", "/api/message", 500, 3);
        assert_eq!(rec.trace_id, ctx.trace_id());
        assert_eq!(rec.span_id, ctx.span_id());
        assert_eq!(rec.parent_span_id, None);
        assert_eq!(rec.status, 500);
    }
}
