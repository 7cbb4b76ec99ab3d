//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing filter, panic catcher, timeout, request ID)
//! - Bind server to listener
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::http::middleware::{panic_response, trace_middleware};
use crate::observability::{MetricsRegistry, ProcessProbe};
use crate::services::{CacheService, HostInfo, MessageService};
use crate::trace::TracingFilter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<MetricsRegistry>,
    pub probe: ProcessProbe,
    pub cache: CacheService,
    pub messages: MessageService,
    pub host: Arc<HostInfo>,
}

impl AppState {
    pub fn new(config: ServiceConfig, metrics: Arc<MetricsRegistry>) -> Self {
        let cache = CacheService::new(&config.cache);
        let messages = MessageService::new(&config.messaging);

        Self {
            config: Arc::new(config),
            metrics,
            probe: ProcessProbe::new(),
            cache,
            messages,
            host: Arc::new(HostInfo::detect()),
        }
    }
}

/// HTTP server for the backend service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server. `metrics` is shared with whoever else reads
    /// the counters.
    pub fn new(config: ServiceConfig, metrics: Arc<MetricsRegistry>) -> Self {
        let state = AppState::new(config, metrics);
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// The fully layered router, for driving with `oneshot` in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.state.config.service.name,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// Layers added later wrap the earlier ones. The tracing middleware sits
/// outside the panic catcher so a panicking handler is still traced, and
/// inside the timeout.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let filter = Arc::new(TracingFilter::new(
        state.config.service.name.clone(),
        state.metrics.clone(),
    ));
    let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api", get(handlers::info))
        .route("/api/", get(handlers::info))
        .route("/api/info", get(handlers::info))
        .route(
            "/api/cache/{key}",
            get(handlers::cache_get)
                .put(handlers::cache_put)
                .delete(handlers::cache_delete),
        )
        .route("/api/message", post(handlers::publish))
        .route("/api/slow", get(handlers::slow))
        .route("/api/error", get(handlers::error_status))
        .route("/api/fail", get(handlers::fail))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(filter, trace_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
