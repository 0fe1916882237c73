//! Router fallbacks.
//!
//! Unmatched paths and unmatched methods get the same JSON error body as
//! every other failure.

use crate::error::RestError;

/// Handler for paths no route matches.
pub async fn not_found_handler() -> RestError {
    RestError::NotFound
}

/// Handler for a matched path with an unsupported method.
pub async fn method_not_allowed_handler() -> RestError {
    RestError::MethodNotAllowed
}
