//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use was_backend::config::ServiceConfig;
use was_backend::{HttpServer, MetricsRegistry, Shutdown};

/// A running server on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub metrics: Arc<MetricsRegistry>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the service with `config`, bound to 127.0.0.1 on a free port.
pub async fn start_server(mut config: ServiceConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let metrics = Arc::new(MetricsRegistry::new());
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, metrics.clone());
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // The listener is already bound; give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        metrics,
        shutdown,
    }
}

/// Start the service with default config.
#[allow(dead_code)]
pub async fn start_default_server() -> TestServer {
    start_server(ServiceConfig::default()).await
}

/// Client that never pools or proxies, so every test talks to its own server.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Whether `s` is exactly `len` lowercase hex characters.
#[allow(dead_code)]
pub fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
