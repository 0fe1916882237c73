//! FHIR route configuration.
//!
//! Defines all routes for the FHIR RESTful API and the route table printed by
//! the CLI.

use std::fmt::Write as _;

use axum::{Router, routing::get};
use serde::Serialize;

use crate::handlers;
use crate::middleware::heartbeat::PING_PATH;
use crate::state::AppState;

/// One line of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// HTTP method.
    pub method: &'static str,
    /// Path pattern.
    pub route: &'static str,
}

const fn route(method: &'static str, route: &'static str) -> RouteInfo {
    RouteInfo { method, route }
}

/// Every route the server answers, in registration order.
pub const ROUTES: &[RouteInfo] = &[
    route("GET", PING_PATH),
    route("GET", "/metadata"),
    route("GET", "/CapabilityStatement"),
    route("GET", "/{resource_type}"),
    route("POST", "/{resource_type}"),
    route("GET", "/{resource_type}/{id}"),
    route("PUT", "/{resource_type}/{id}"),
    route("DELETE", "/{resource_type}/{id}"),
    route("GET", "/{resource_type}/{id}/_history/{version_id}"),
];

/// Creates all FHIR REST API routes.
///
/// # Routes
///
/// ## System-level
/// - `GET /metadata` - CapabilityStatement
/// - `GET /CapabilityStatement` - CapabilityStatement
/// - `GET /ping` - Liveness probe, answered by the pipeline before routing
///
/// ## Type-level
/// - `GET /{type}` - Search
/// - `POST /{type}` - Create
///
/// ## Instance-level
/// - `GET /{type}/{id}` - Read
/// - `PUT /{type}/{id}` - Update
/// - `DELETE /{type}/{id}` - Delete
/// - `GET /{type}/{id}/_history/{vid}` - Version read
///
/// Unmatched paths answer `404 Not Found`, unmatched methods `405 Not Allowed`.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // System-level routes
        .route("/metadata", get(handlers::capabilities_handler))
        .route("/CapabilityStatement", get(handlers::capabilities_handler))
        // Type-level routes
        .route(
            "/{resource_type}",
            get(handlers::search_type_handler).post(handlers::create_handler),
        )
        // Instance-level routes
        .route(
            "/{resource_type}/{id}",
            get(handlers::read_handler)
                .put(handlers::update_handler)
                .delete(handlers::delete_handler),
        )
        .route(
            "/{resource_type}/{id}/_history/{version_id}",
            get(handlers::vread_handler),
        )
        .fallback(handlers::not_found_handler)
        .method_not_allowed_fallback(handlers::method_not_allowed_handler)
        // State
        .with_state(state)
}

/// Renders the route table as aligned `METHOD | ROUTE` lines.
pub fn format_route_table(routes: &[RouteInfo]) -> String {
    let width = routes
        .iter()
        .map(|r| r.method.len())
        .chain(std::iter::once("METHOD".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$} | ROUTE", "METHOD");
    for r in routes {
        let _ = writeln!(out, "{:<width$} | {}", r.method, r.route);
    }
    out
}
