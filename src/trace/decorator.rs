//! Request view with synthesized trace headers.
//!
//! Downstream handlers must see `X-Trace-Id`, `X-Span-Id`, `X-Parent-Span-Id`
//! and `X-Service` as if the client had sent them. The overlay is kept apart
//! from the inbound request so what the client actually sent stays observable.

use axum::http::{header::HeaderName, HeaderMap, HeaderValue, Request};

use crate::trace::context::TraceContext;

/// The header map exactly as the client sent it.
///
/// Inserted as a request extension by [`TracedRequest::into_request`].
#[derive(Debug, Clone)]
pub struct InboundHeaders(pub HeaderMap);

/// An inbound request plus an overlay of synthesized trace headers.
#[derive(Debug)]
pub struct TracedRequest<B> {
    inner: Request<B>,
    overlay: HeaderMap,
    context: TraceContext,
}

impl<B> TracedRequest<B> {
    pub fn new(inner: Request<B>, context: TraceContext) -> Self {
        let mut overlay = HeaderMap::new();
        for (name, value) in context.synthesized_headers() {
            // Upstream IDs are copied verbatim and may not be valid header values.
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    overlay.insert(HeaderName::from_static(name), value);
                }
                Err(_) => {
                    tracing::debug!(header = name, "Skipping trace header with invalid value");
                }
            }
        }

        Self {
            inner,
            overlay,
            context,
        }
    }

    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// The untouched inbound request.
    pub fn original(&self) -> &Request<B> {
        &self.inner
    }

    /// Header lookup, preferring synthesized values. Case-insensitive.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.overlay
            .get(name)
            .or_else(|| self.inner.headers().get(name))
    }

    /// Header lookup as a string, ignoring values that are not visible ASCII.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Every distinct header name visible through this view, each exactly once.
    pub fn header_names(&self) -> impl Iterator<Item = &HeaderName> {
        self.inner
            .headers()
            .keys()
            .filter(move |name| !self.overlay.contains_key(*name))
            .chain(self.overlay.keys())
    }

    /// Build the request handed to downstream handlers.
    ///
    /// Synthesized values replace any client header of the same name. The
    /// client's header map and the trace context travel as extensions.
    pub fn into_request(self) -> Request<B> {
        let (mut parts, body) = self.inner.into_parts();
        let inbound = parts.headers.clone();

        for (name, value) in self.overlay.iter() {
            parts.headers.insert(name.clone(), value.clone());
        }
        parts.extensions.insert(InboundHeaders(inbound));
        parts.extensions.insert(self.context);

        Request::from_parts(parts, body)
    }
}
