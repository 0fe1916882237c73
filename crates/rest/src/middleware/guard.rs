//! Request guards: a deadline and panic recovery.
//!
//! The deadline drops the handler future when it fires, which cancels any
//! work the handler still has in flight. Panics are turned into a JSON 500
//! so the server keeps serving. Both run inside the pipeline's request span,
//! so their log lines carry the request id.

use std::any::Any;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, warn};

use super::stamp::X_REQUEST_ID;
use crate::error::RestError;

/// Deadline applied to every routed request.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline {
    timeout: Duration,
}

impl RequestDeadline {
    /// Creates a deadline of `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Runs the rest of the stack under the request deadline.
///
/// On expiry the inner future is dropped and a 504 is returned.
pub async fn deadline_middleware(
    State(deadline): State<RequestDeadline>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match tokio::time::timeout(deadline.timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(
                method = %method,
                path = %path,
                request_id = %request_id,
                timeout_secs = deadline.timeout.as_secs_f64(),
                "Request deadline exceeded"
            );
            RestError::Timeout {
                seconds: deadline.timeout.as_secs(),
            }
            .into_response()
        }
    }
}

/// Panic handler signature used by [`catch_panic_layer`].
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Returns a layer converting handler panics into a JSON 500.
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(panic_response as PanicHandler)
}

/// Builds the response for a recovered panic.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!(panic = %detail, "Handler panicked");

    RestError::InternalError {
        message: "handler panicked".to_string(),
    }
    .into_response()
}
