//! Inbound trace context resolution.
//!
//! # Responsibilities
//! - Extract an upstream trace identity from request headers
//! - Fall back to a fresh root trace when nothing usable was sent
//!
//! # Design Decisions
//! - Strict priority: W3C `traceparent`, then B3, then synthesis
//! - Malformed headers are treated as absent, never as errors
//! - The span ID is always minted locally, whichever branch fired

use axum::http::HeaderMap;

use crate::trace::context::{
    generate_trace_id, TraceContext, B3_SAMPLED, B3_SPAN_ID, B3_TRACE_ID, TRACEPARENT,
};

/// Upstream identity found in propagation headers.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Upstream {
    trace_id: String,
    parent_span_id: Option<String>,
    sampled: bool,
}

/// Resolves one `TraceContext` per inbound request.
#[derive(Debug, Clone)]
pub struct TraceResolver {
    service_name: String,
}

impl TraceResolver {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Resolve the trace context for a set of inbound headers. Never fails.
    pub fn resolve(&self, headers: &HeaderMap) -> TraceContext {
        let upstream = from_traceparent(headers).or_else(|| from_b3(headers));

        match upstream {
            Some(up) => {
                tracing::trace!(trace_id = %up.trace_id, sampled = up.sampled, "Continuing upstream trace");
                TraceContext::new(up.trace_id, up.parent_span_id, &*self.service_name, up.sampled)
            }
            None => TraceContext::new(generate_trace_id(), None, &*self.service_name, true),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// `version-traceid-spanid-flags`. Fields past the fourth are ignored.
///
/// Trailing empty fields are not counted, so `00-abc-def-` has three fields.
fn from_traceparent(headers: &HeaderMap) -> Option<Upstream> {
    let value = header_str(headers, TRACEPARENT)?;
    let mut parts: Vec<&str> = value.split('-').collect();
    while parts.last() == Some(&"") {
        parts.pop();
    }
    if parts.len() < 4 {
        tracing::debug!(traceparent = %value, "Ignoring malformed traceparent");
        return None;
    }

    let trace_id = non_empty(parts[1])?;
    Some(Upstream {
        trace_id,
        parent_span_id: non_empty(parts[2]),
        sampled: parts[3] == "01",
    })
}

fn from_b3(headers: &HeaderMap) -> Option<Upstream> {
    let trace_id = header_str(headers, B3_TRACE_ID)?.to_string();
    Some(Upstream {
        trace_id,
        parent_span_id: header_str(headers, B3_SPAN_ID).map(str::to_string),
        sampled: header_str(headers, B3_SAMPLED) == Some("1"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).unwrap();
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    fn is_lower_hex(s: &str, len: usize) -> bool {
        s.len() == len && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    #[test]
    fn test_w3c_traceparent() {
        let resolver = TraceResolver::new("was-test");
        let ctx = resolver.resolve(&headers(&[(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )]));

        assert_eq!(ctx.trace_id(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.parent_span_id(), Some("00f067aa0ba902b7"));
        assert!(ctx.is_sampled());
        assert_ne!(ctx.span_id(), "00f067aa0ba902b7");
        assert!(is_lower_hex(ctx.span_id(), 16));
        assert_eq!(ctx.service_name(), "was-test");
    }

    #[test]
    fn test_w3c_not_sampled() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&headers(&[("traceparent", "00-abc-def-00")]));
        assert_eq!(ctx.trace_id(), "abc");
        assert!(!ctx.is_sampled());
    }

    #[test]
    fn test_b3_headers() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&headers(&[("X-B3-TraceId", "abc123"), ("X-B3-Sampled", "0")]));
        assert_eq!(ctx.trace_id(), "abc123");
        assert!(!ctx.is_sampled());
        assert!(ctx.is_root());

        let ctx = resolver.resolve(&headers(&[
            ("x-b3-traceid", "abc123"),
            ("x-b3-spanid", "0011223344556677"),
            ("x-b3-sampled", "1"),
        ]));
        assert_eq!(ctx.parent_span_id(), Some("0011223344556677"));
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_traceparent_wins_over_b3() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&headers(&[
            ("traceparent", "00-aaaa-bbbb-01"),
            ("x-b3-traceid", "cccc"),
        ]));
        assert_eq!(ctx.trace_id(), "aaaa");
    }

    #[test]
    fn test_malformed_traceparent_falls_through_to_b3() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&headers(&[
            ("traceparent", "00-aaaa-bbbb"),
            ("x-b3-traceid", "cccc"),
            ("x-b3-sampled", "1"),
        ]));
        assert_eq!(ctx.trace_id(), "cccc");
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_trailing_empty_fields_do_not_count() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&headers(&[
            ("traceparent", "00-abc-def-"),
            ("x-b3-traceid", "b3trace"),
            ("x-b3-sampled", "1"),
        ]));
        assert_eq!(ctx.trace_id(), "b3trace");
        assert_eq!(ctx.parent_span_id(), None);
        assert!(ctx.is_sampled());

        let ctx = resolver.resolve(&headers(&[("traceparent", "00-abc--")]));
        assert!(is_lower_hex(ctx.trace_id(), 32));
        assert!(ctx.is_root());
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_no_headers_synthesizes_root() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&HeaderMap::new());
        assert!(is_lower_hex(ctx.trace_id(), 32));
        assert!(is_lower_hex(ctx.span_id(), 16));
        assert!(ctx.is_sampled());
        assert!(ctx.is_root());
    }

    #[test]
    fn test_empty_values_are_absent() {
        let resolver = TraceResolver::new("svc");
        let ctx = resolver.resolve(&headers(&[("traceparent", ""), ("x-b3-traceid", "")]));
        assert!(is_lower_hex(ctx.trace_id(), 32));

        let ctx = resolver.resolve(&headers(&[("traceparent", "00--bbbb-01")]));
        assert!(is_lower_hex(ctx.trace_id(), 32));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    fn resolve_with(pairs: &[(&'static str, String)]) -> TraceContext {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        TraceResolver::new("svc").resolve(&map)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_traceparent_fields(
            version in "[0-9a-f]{2}",
            trace_id in "[0-9a-f]{1,32}",
            span_id in "[0-9a-f]{1,16}",
            flags in "[0-9a-f]{2}",
        ) {
            let value = format!("{}-{}-{}-{}", version, trace_id, span_id, flags);
            let ctx = resolve_with(&[("traceparent", value)]);

            prop_assert_eq!(ctx.trace_id(), trace_id.as_str());
            prop_assert_eq!(ctx.parent_span_id(), Some(span_id.as_str()));
            prop_assert_eq!(ctx.is_sampled(), flags == "01");
            prop_assert_ne!(ctx.span_id(), span_id.as_str());
        }

        #[test]
        fn prop_short_traceparent_is_ignored(fields in prop::collection::vec("[0-9a-z]{1,8}", 1..4)) {
            let value = fields.join("-");
            let ctx = resolve_with(&[("traceparent", value)]);

            prop_assert_eq!(ctx.trace_id().len(), 32);
            prop_assert!(ctx.is_sampled());
            prop_assert!(ctx.is_root());
        }

        #[test]
        fn prop_span_id_never_inherited(b3_span in "[0-9a-f]{16}") {
            let ctx = resolve_with(&[
                ("x-b3-traceid", "abc123".to_string()),
                ("x-b3-spanid", b3_span.clone()),
            ]);
            prop_assert_ne!(ctx.span_id(), b3_span.as_str());
            prop_assert_eq!(ctx.span_id().len(), 16);
        }

        #[test]
        fn prop_independent_roots_do_not_collide(_seed in 0u32..100) {
            let a = resolve_with(&[]);
            let b = resolve_with(&[]);
            prop_assert_ne!(a.trace_id(), b.trace_id());
            prop_assert_ne!(a.span_id(), b.span_id());
        }
    }
}
