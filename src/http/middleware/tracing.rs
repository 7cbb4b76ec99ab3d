//! Tracing middleware.
//!
//! Runs every request through [`TracingFilter::instrument`]. A response
//! marked with [`HandlerFailure`] counts as a failed handler: it is recorded
//! as status 500 and reaches the client as a 500, never as a success.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::AppError;
use crate::trace::{stamp_trace_headers, TracingFilter};

/// Response extension marking the handler as failed.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub reason: String,
}

/// A response produced by a failed handler.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct FailedResponse {
    reason: String,
    response: Response,
}

impl FailedResponse {
    fn classify(response: Response) -> Result<Response, Self> {
        let reason = response
            .extensions()
            .get::<HandlerFailure>()
            .map(|failure| failure.reason.clone());

        match reason {
            Some(reason) => Err(Self { reason, response }),
            None => Ok(response),
        }
    }
}

pub async fn trace_middleware(
    State(filter): State<Arc<TracingFilter>>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = filter
        .instrument(request, |traced| async move {
            FailedResponse::classify(next.run(traced.into_request()).await)
        })
        .await;

    match outcome {
        Ok(response) => response,
        Err(err) => {
            let (context, failed) = err.into_parts();
            tracing::error!(
                trace_id = %context.trace_id(),
                span_id = %context.span_id(),
                reason = %failed.reason,
                "Request handler failed"
            );

            let mut response = failed.response;
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            stamp_trace_headers(response.headers_mut(), &context);
            response
        }
    }
}

/// Response for `CatchPanicLayer::custom`; a panic is a handler failure.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
