//! Traced backend service library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod services;
pub mod trace;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::MetricsRegistry;
pub use trace::TracingFilter;
