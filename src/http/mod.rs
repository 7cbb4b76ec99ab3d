//! HTTP service surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/tracing.rs (resolve trace, decorate, time the handler)
//!     → handlers.rs (read decorated headers, talk to simulated services)
//!     → error.rs (handler failures marked for the tracing middleware)
//!     → Send to client with X-Trace-Id / X-Span-Id / X-Service
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use error::AppError;
pub use server::{build_router, AppState, HttpServer};
