//! Capabilities (CapabilityStatement) handler.
//!
//! Implements the FHIR [capabilities interaction](https://hl7.org/fhir/http.html#capabilities):
//! `GET [base]/metadata`, also served at `GET [base]/CapabilityStatement`.
//!
//! The document is rendered once at startup. This handler only copies out
//! the cached bytes, so repeated calls return byte-identical bodies.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::{FHIR_JSON, RequestContext};
use crate::state::AppState;

/// Handler for the capabilities interaction.
///
/// # Response
///
/// - `200 OK` - The cached CapabilityStatement
/// - `500 Internal Server Error` - Nothing was cached
pub async fn capabilities_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> RestResult<Response> {
    let capabilities = state.capabilities();

    if capabilities.is_empty() {
        debug!(request_id = %ctx.request_id(), "CapabilityStatement cache is empty");
        return Err(RestError::CapabilityUnavailable);
    }

    debug!(
        request_id = %ctx.request_id(),
        bytes = capabilities.bytes().len(),
        "Serving cached CapabilityStatement"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, FHIR_JSON)],
        capabilities.bytes().clone(),
    )
        .into_response())
}
