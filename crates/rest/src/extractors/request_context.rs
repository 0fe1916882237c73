//! Request context extractor.
//!
//! Hands handlers the [`RequestContext`] built by the pipeline driver.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::RestError;
use crate::middleware::RequestContext;

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .remove::<RequestContext>()
            .ok_or_else(|| RestError::InternalError {
                message: "request context missing; the pipeline middleware is not installed"
                    .to_string(),
            })
    }
}
