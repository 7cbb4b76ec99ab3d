//! Endpoint handlers.
//!
//! Handlers never touch the trace context directly: they read the
//! `X-Trace-Id` family of headers the tracing middleware put on the request,
//! the same way any downstream code would.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{connect_info::ConnectInfo, rejection::JsonRejection, FromRequestParts, Path, Query, Request, State},
    http::{header, request::Parts, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::server::AppState;
use crate::observability::metrics::{render_exposition, EXPOSITION_CONTENT_TYPE};
use crate::observability::ProcessStats;
use crate::services::{CacheHealth, MessagingHealth, Published};
use crate::trace::context::{X_PARENT_SPAN_ID, X_SPAN_ID, X_TRACE_ID};

const JAEGER_ENDPOINT: &str = "http://jaeger:14268/api/traces";
const MAX_SLOW_DELAY_MS: u64 = 60_000;

/// Trace identifiers as seen by a handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceInfo {
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
}

/// Extractor for the decorated trace headers. `None` without `X-Trace-Id`.
#[derive(Debug, Clone)]
pub struct RequestTrace(pub Option<TraceInfo>);

impl<S: Send + Sync> FromRequestParts<S> for RequestTrace {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let get = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Ok(RequestTrace(get(X_TRACE_ID).map(|trace_id| TraceInfo {
            trace_id,
            span_id: get(X_SPAN_ID),
            parent_span_id: get(X_PARENT_SPAN_ID),
        })))
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CollectorHealth {
    pub status: &'static str,
    pub endpoint: &'static str,
}

#[derive(Serialize)]
pub struct Dependencies {
    pub redis: CacheHealth,
    pub kafka: MessagingHealth,
    pub jaeger: CollectorHealth,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    pub hostname: String,
    pub ip: String,
    pub process: ProcessStats,
    pub dependencies: Dependencies,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

pub async fn health(
    State(state): State<AppState>,
    RequestTrace(trace): RequestTrace,
) -> Json<HealthResponse> {
    let process = state.probe.sample(state.metrics.uptime()).await;

    Json(HealthResponse {
        status: "UP",
        service: state.config.service.name.clone(),
        kind: state.config.service.kind.clone(),
        timestamp: now_rfc3339(),
        hostname: state.host.hostname.clone(),
        ip: state.host.ip.clone(),
        process,
        dependencies: Dependencies {
            redis: state.cache.health(),
            kafka: state.messages.health(),
            jaeger: CollectorHealth {
                status: "UP",
                endpoint: JAEGER_ENDPOINT,
            },
        },
        trace_id: trace.map(|t| t.trace_id),
    })
}

// ---------------------------------------------------------------------------
// Info
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub remote_addr: String,
    pub method: String,
    pub uri: String,
    pub protocol: String,
}

#[derive(Serialize)]
pub struct InfoResponse {
    pub service: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub framework: String,
    pub version: &'static str,
    pub timestamp: String,
    pub hostname: String,
    pub ip: String,
    pub environment: BTreeMap<&'static str, String>,
    pub request: RequestDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceInfo>,
}

fn environment() -> BTreeMap<&'static str, String> {
    [
        ("POD_NAME", "local"),
        ("POD_NAMESPACE", "default"),
        ("NODE_NAME", "local"),
    ]
    .into_iter()
    .map(|(key, default)| (key, std::env::var(key).unwrap_or_else(|_| default.to_string())))
    .collect()
}

pub async fn info(
    State(state): State<AppState>,
    RequestTrace(trace): RequestTrace,
    request: Request,
) -> Json<InfoResponse> {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Json(InfoResponse {
        service: state.config.service.name.clone(),
        kind: state.config.service.kind.clone(),
        framework: state.config.service.framework.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now_rfc3339(),
        hostname: state.host.hostname.clone(),
        ip: state.host.ip.clone(),
        environment: environment(),
        request: RequestDetails {
            remote_addr,
            method: request.method().to_string(),
            uri: request.uri().path().to_string(),
            protocol: format!("{:?}", request.version()),
        },
        trace,
    })
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CacheGetResponse {
    pub operation: &'static str,
    pub key: String,
    pub value: Option<serde_json::Value>,
    pub found: bool,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceInfo>,
}

pub async fn cache_get(
    State(state): State<AppState>,
    RequestTrace(trace): RequestTrace,
    Path(key): Path<String>,
) -> Json<CacheGetResponse> {
    let value = state.cache.get(&key);
    tracing::debug!(key = %key, found = value.is_some(), "Cache GET");

    Json(CacheGetResponse {
        operation: "GET",
        found: value.is_some(),
        key,
        value,
        source: state.cache.cluster().to_string(),
        trace,
    })
}

#[derive(Debug, Deserialize)]
pub struct CachePutRequest {
    #[serde(default)]
    pub value: serde_json::Value,
    /// Seconds; the configured default applies when absent.
    pub ttl: Option<u64>,
}

#[derive(Serialize)]
pub struct CachePutResponse {
    pub operation: &'static str,
    pub key: String,
    pub value: serde_json::Value,
    pub ttl: u64,
    pub success: bool,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceInfo>,
}

pub async fn cache_put(
    State(state): State<AppState>,
    RequestTrace(trace): RequestTrace,
    Path(key): Path<String>,
    payload: Result<Json<CachePutRequest>, JsonRejection>,
) -> Result<Json<CachePutResponse>, AppError> {
    let Json(body) = payload?;
    if body.ttl == Some(0) {
        return Err(AppError::BadRequest("ttl must be greater than zero".to_string()));
    }

    let ttl = state
        .cache
        .set(key.clone(), body.value.clone(), body.ttl.map(Duration::from_secs));
    tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache SET");

    Ok(Json(CachePutResponse {
        operation: "SET",
        key,
        value: body.value,
        ttl: ttl.as_secs(),
        success: true,
        destination: state.cache.cluster().to_string(),
        trace,
    }))
}

#[derive(Serialize)]
pub struct CacheDeleteResponse {
    pub operation: &'static str,
    pub key: String,
    pub deleted: bool,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceInfo>,
}

pub async fn cache_delete(
    State(state): State<AppState>,
    RequestTrace(trace): RequestTrace,
    Path(key): Path<String>,
) -> Json<CacheDeleteResponse> {
    let deleted = state.cache.delete(&key);
    tracing::debug!(key = %key, deleted, "Cache DELETE");

    Json(CacheDeleteResponse {
        operation: "DELETE",
        key,
        deleted,
        destination: state.cache.cluster().to_string(),
        trace,
    })
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub topic: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub message: serde_json::Value,
}

#[derive(Serialize)]
pub struct PublishResponse {
    pub operation: &'static str,
    #[serde(flatten)]
    pub published: Published,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceInfo>,
}

pub async fn publish(
    State(state): State<AppState>,
    RequestTrace(trace): RequestTrace,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>, AppError> {
    let Json(body) = payload?;
    let message = match body.message {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    let published = state.messages.publish(
        body.topic.as_deref(),
        body.key.as_deref(),
        &message,
        trace.as_ref().map(|t| t.trace_id.as_str()),
    );

    Ok(Json(PublishResponse {
        operation: "PUBLISH",
        published,
        success: true,
        trace,
    }))
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let counters = state.metrics.snapshot();
    let process = state.probe.sample(state.metrics.uptime()).await;
    let body = render_exposition(&state.config.service, &counters, &process);

    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body)
}

// ---------------------------------------------------------------------------
// Test probes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SlowParams {
    #[serde(default = "default_delay")]
    pub delay: u64,
}

fn default_delay() -> u64 {
    1000
}

/// Sleeps for `delay` milliseconds, for exercising proxy timeouts.
pub async fn slow(
    State(state): State<AppState>,
    Query(params): Query<SlowParams>,
) -> Json<serde_json::Value> {
    let delay = params.delay.min(MAX_SLOW_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(delay)).await;

    Json(serde_json::json!({
        "service": state.config.service.name,
        "endpoint": "/api/slow",
        "delay_ms": delay,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ErrorParams {
    #[serde(default = "default_error_code")]
    pub code: u16,
}

fn default_error_code() -> u16 {
    500
}

/// Answers with the requested status. The handler itself succeeds.
pub async fn error_status(
    State(state): State<AppState>,
    Query(params): Query<ErrorParams>,
) -> Result<impl IntoResponse, AppError> {
    let status = StatusCode::from_u16(params.code)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .ok_or_else(|| AppError::BadRequest(format!("not an error status: {}", params.code)))?;

    Ok((
        status,
        Json(serde_json::json!({
            "service": state.config.service.name,
            "endpoint": "/api/error",
            "error_code": status.as_u16(),
        })),
    ))
}

/// Always fails.
pub async fn fail() -> Result<Json<serde_json::Value>, AppError> {
    Err(AppError::Internal("induced failure".to_string()))
}

#[derive(Serialize)]
pub struct NotFoundResponse {
    pub error: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceInfo>,
}

pub async fn not_found(RequestTrace(trace): RequestTrace, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Endpoint not found",
            path: uri.path().to_string(),
            trace,
        }),
    )
}
