//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the backend service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity of this service as reported in traces and metrics.
    pub service: ServiceSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Simulated cache cluster.
    pub cache: CacheConfig,

    /// Simulated message broker.
    pub messaging: MessagingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name, sent as `X-Service` and used in span records.
    pub name: String,

    /// Deployment type label (e.g., "legacy", "kubernetes").
    #[serde(rename = "type")]
    pub kind: String,

    /// Runtime label for `was_info`.
    pub runtime: String,

    /// Human-readable framework description for `/api/info`.
    pub framework: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "was-9-rust".to_string(),
            kind: "kubernetes".to_string(),
            runtime: "tokio".to_string(),
            framework: "Rust + Axum".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Simulated cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when a PUT does not carry one, in seconds.
    pub default_ttl_secs: u64,

    /// Cluster label reported as the data source.
    pub cluster: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            cluster: "redis-cluster:6379".to_string(),
        }
    }
}

/// Simulated message broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Topic messages are published to.
    pub topic: String,

    /// Broker list reported in health checks.
    pub brokers: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            topic: "nginx-test-events".to_string(),
            brokers: "kafka-1:9092,kafka-2:9092,kafka-3:9092".to_string(),
        }
    }
}
