//! Per-request tracing filter.
//!
//! # Responsibilities
//! - Resolve a trace context and decorate the request before the handler runs
//! - Emit exactly one span record when the handler finishes or fails
//! - Feed request, error and duration counters
//! - Stamp `X-Trace-Id`, `X-Span-Id` and `X-Service` on the outcome
//!
//! # Design Decisions
//! - The handler outcome is an explicit `Result`; failures are recorded as
//!   status 500 and handed back to the caller wrapped in [`TracedError`]
//! - An [`ActiveSpan`] dropped before `finish` emits nothing, so requests
//!   cancelled by an outer timeout leave no span behind

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};

use crate::observability::MetricsRegistry;
use crate::trace::context::{TraceContext, X_SERVICE, X_SPAN_ID, X_TRACE_ID};
use crate::trace::decorator::TracedRequest;
use crate::trace::resolver::TraceResolver;
use crate::trace::span::SpanRecord;

/// Status recorded for a failed handler, whatever it had set.
const FAILURE_STATUS: u16 = 500;

/// Entry point of the tracing core, shared by every request.
#[derive(Debug, Clone)]
pub struct TracingFilter {
    resolver: TraceResolver,
    metrics: Arc<MetricsRegistry>,
}

impl TracingFilter {
    pub fn new(service_name: impl Into<String>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            resolver: TraceResolver::new(service_name),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn service_name(&self) -> &str {
        self.resolver.service_name()
    }

    /// Resolve the context, wrap the request and start the clock.
    pub fn begin<B>(&self, request: Request<B>) -> (ActiveSpan, TracedRequest<B>) {
        let started = Instant::now();
        let context = self.resolver.resolve(request.headers());

        let span = ActiveSpan {
            context: context.clone(),
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            started,
            metrics: self.metrics.clone(),
        };

        (span, TracedRequest::new(request, context))
    }

    /// Run `handler` on the decorated request and record its outcome.
    pub async fn instrument<B, R, E, F, Fut>(
        &self,
        request: Request<B>,
        handler: F,
    ) -> Result<Response<R>, TracedError<E>>
    where
        F: FnOnce(TracedRequest<B>) -> Fut,
        Fut: Future<Output = Result<Response<R>, E>>,
    {
        let (span, traced) = self.begin(request);
        let result = handler(traced).await;
        span.finish(result)
    }
}

/// A request between resolution and completion.
#[derive(Debug)]
#[must_use = "dropping an ActiveSpan without finish() records nothing"]
pub struct ActiveSpan {
    context: TraceContext,
    method: String,
    path: String,
    started: Instant,
    metrics: Arc<MetricsRegistry>,
}

impl ActiveSpan {
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// Record the handler outcome.
    ///
    /// Counters are updated and one span line is emitted in both cases. A
    /// successful response gets the trace headers; a failure is recorded with
    /// status 500 and returned as [`TracedError`] so the caller still sees it.
    pub fn finish<R, E>(self, result: Result<Response<R>, E>) -> Result<Response<R>, TracedError<E>> {
        let duration_ms = self.started.elapsed().as_millis() as u64;

        // request_count before error_count keeps errors <= requests for readers.
        self.metrics.record_request();
        self.metrics.add_duration(duration_ms);

        match result {
            Ok(mut response) => {
                let status = response.status().as_u16();
                SpanRecord::new(&self.context, self.method, self.path, status, duration_ms).emit();
                stamp_trace_headers(response.headers_mut(), &self.context);
                Ok(response)
            }
            Err(source) => {
                self.metrics.record_error();
                SpanRecord::new(&self.context, self.method, self.path, FAILURE_STATUS, duration_ms)
                    .emit();
                Err(TracedError {
                    context: self.context,
                    source,
                })
            }
        }
    }
}

/// A handler failure, carrying the trace it happened in.
#[derive(Debug)]
pub struct TracedError<E> {
    context: TraceContext,
    source: E,
}

impl<E> TracedError<E> {
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    pub fn into_parts(self) -> (TraceContext, E) {
        (self.context, self.source)
    }

    /// Set the trace headers on whatever response reports this failure.
    pub fn stamp(&self, headers: &mut HeaderMap) {
        stamp_trace_headers(headers, &self.context);
    }
}

impl<E: fmt::Display> fmt::Display for TracedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request failed in trace {}: {}", self.context.trace_id(), self.source)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TracedError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Outbound trace headers set on every response.
pub fn stamp_trace_headers(headers: &mut HeaderMap, context: &TraceContext) {
    let values = [
        (X_TRACE_ID, context.trace_id()),
        (X_SPAN_ID, context.span_id()),
        (X_SERVICE, context.service_name()),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
