//! Traced backend service.
//!
//! A demo backend meant to sit behind a reverse proxy. Every request is
//! joined to an upstream trace (W3C `traceparent` or Zipkin B3) or starts a
//! new one; handlers see the trace as plain headers; one span line and three
//! counters are recorded per request and exposed at `/metrics`.
//!
//! ```text
//!   client / proxy
//!        │  traceparent | X-B3-* | nothing
//!        ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ trace middleware (resolve → decorate → time)  │
//!   │      │                                        │
//!   │      ▼                                        │
//!   │  handlers ── cache (simulated)                │
//!   │      │    └─ messaging (simulated)            │
//!   │      ▼                                        │
//!   │ span record + counters + X-Trace-Id headers   │
//!   └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use was_backend::config::{load_or_default, validate_config, ConfigError};
use was_backend::lifecycle::{wait_for_signal, Shutdown};
use was_backend::observability::logging::init_logging;
use was_backend::{HttpServer, MetricsRegistry};

#[derive(Parser, Debug)]
#[command(name = "was-backend")]
#[command(about = "Traced demo backend service", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, env = "WAS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long, env = "WAS_BIND")]
    bind: Option<String>,

    /// Override the service name reported in traces and metrics.
    #[arg(long, env = "OTEL_SERVICE_NAME")]
    service_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Uptime counts from here, before config load and bind.
    let metrics = Arc::new(MetricsRegistry::new());
    let args = Args::parse();

    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(name) = args.service_name {
        config.service.name = name;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        "was-backend starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        config_file = ?args.config,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, metrics);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let mut server_task = tokio::spawn(server.run(listener, server_shutdown));

    let signalled = tokio::select! {
        result = wait_for_signal() => match result {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handlers, serving until the server exits");
                false
            }
        },
        result = &mut server_task => {
            result??;
            tracing::warn!("HTTP server exited without a shutdown signal");
            return Ok(());
        }
    };

    if signalled {
        shutdown.trigger();
    }
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
