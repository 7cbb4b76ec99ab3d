//! Request middleware.

pub mod tracing;

pub use self::tracing::{panic_response, trace_middleware, FailedResponse, HandlerFailure};
