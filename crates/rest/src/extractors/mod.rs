//! Axum extractors for FHIR-specific data.
//!
//! - [`RequestContext`](crate::middleware::RequestContext) - The per-request
//!   context produced by the pipeline

mod request_context;
