//! End-to-end trace propagation over a real listener.

use serde_json::Value;
use was_backend::config::ServiceConfig;

mod common;

#[tokio::test]
async fn test_joins_w3c_trace() {
    let server = common::start_default_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/api/info"))
        .header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["x-trace-id"],
        "4bf92f3577b34da6a3ce929d0e0e4736"
    );
    let span_id = res.headers()["x-span-id"].to_str().unwrap().to_string();
    assert!(common::is_lower_hex(&span_id, 16));
    assert_ne!(span_id, "00f067aa0ba902b7");
    assert_eq!(res.headers()["x-service"], "was-9-rust");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["trace"]["traceId"], "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(body["trace"]["spanId"], span_id.as_str());
    assert_eq!(body["trace"]["parentSpanId"], "00f067aa0ba902b7");
    assert_eq!(body["request"]["remoteAddr"], "127.0.0.1");
}

#[tokio::test]
async fn test_joins_b3_trace() {
    let server = common::start_default_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/api/info"))
        .header("X-B3-TraceId", "abc123")
        .header("X-B3-SpanId", "def456")
        .header("X-B3-Sampled", "1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-trace-id"], "abc123");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["trace"]["parentSpanId"], "def456");
}

#[tokio::test]
async fn test_traceparent_wins_over_b3() {
    let server = common::start_default_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/api/info"))
        .header("traceparent", "00-t1-p1-00")
        .header("X-B3-TraceId", "t2")
        .header("X-B3-SpanId", "p2")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-trace-id"], "t1");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["trace"]["parentSpanId"], "p1");
}

#[tokio::test]
async fn test_starts_new_trace_without_headers() {
    let server = common::start_default_server().await;
    let client = common::client();

    let res = client.get(server.url("/api/info")).send().await.unwrap();

    let trace_id = res.headers()["x-trace-id"].to_str().unwrap().to_string();
    let span_id = res.headers()["x-span-id"].to_str().unwrap().to_string();
    assert!(common::is_lower_hex(&trace_id, 32), "{trace_id}");
    assert!(common::is_lower_hex(&span_id, 16), "{span_id}");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["trace"]["traceId"], trace_id.as_str());
    assert!(body["trace"].get("parentSpanId").is_none());
}

#[tokio::test]
async fn test_malformed_traceparent_starts_new_trace() {
    let server = common::start_default_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/api/info"))
        .header("traceparent", "garbage")
        .send()
        .await
        .unwrap();

    let trace_id = res.headers()["x-trace-id"].to_str().unwrap();
    assert!(common::is_lower_hex(trace_id, 32));
}

#[tokio::test]
async fn test_client_trace_headers_are_overridden() {
    let server = common::start_default_server().await;
    let client = common::client();

    let res = client
        .get(server.url("/api/info"))
        .header("X-Trace-Id", "spoofed")
        .header("X-Parent-Span-Id", "spoofed-parent")
        .send()
        .await
        .unwrap();

    let trace_id = res.headers()["x-trace-id"].to_str().unwrap().to_string();
    assert_ne!(trace_id, "spoofed");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["trace"]["traceId"], trace_id.as_str());
}

#[tokio::test]
async fn test_service_name_from_config() {
    let mut config = ServiceConfig::default();
    config.service.name = "was-1-tomcat".to_string();
    let server = common::start_server(config).await;

    let res = common::client()
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-service"], "was-1-tomcat");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["service"], "was-1-tomcat");
}
