//! # fhird-rest - Request pipeline and resource registry for fhird
//!
//! This crate provides the HTTP surface of fhird, an experimental
//! [FHIR R4](https://hl7.org/fhir/R4/http.html) server profiled on US Core.
//! It contains the ordered request pipeline every request passes through,
//! the registry of supported resource types, and the CapabilityStatement
//! built from that registry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhird_rest::{ServerConfig, create_app, init_logging, serve};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     init_logging(&config.log_level);
//!
//!     let app = create_app(config.clone())?;
//!     serve(app, &config).await
//! }
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! pipeline: DateStamp, RequestIdStamp, RealIpStamp, Heartbeat,
//!           ContentNegotiator, ParamParser
//!   -> TraceLayer (inside the `http_request{request_id}` span)
//!     -> deadline (504 on expiry)
//!       -> panic recovery (500)
//!         -> router: registry lookup, interaction check, resource handler
//! ```
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern |
//! |------------|-------------|-------------|
//! | capabilities | GET | `/metadata`, `/CapabilityStatement` |
//! | liveness | GET | `/ping` |
//! | search (type) | GET | `/[type]` |
//! | create | POST | `/[type]` |
//! | read | GET | `/[type]/[id]` |
//! | vread | GET | `/[type]/[id]/_history/[vid]` |
//! | update | PUT | `/[type]/[id]` |
//! | delete | DELETE | `/[type]/[id]` |
//!
//! ## Error Handling
//!
//! Every request-scoped error is returned as `{"error": "..."}`:
//!
//! | HTTP Status | Cause |
//! |-------------|-------|
//! | 404 | Unknown resource type or unmatched path |
//! | 405 | Unsupported method or undeclared interaction |
//! | 415 | Unsupported `Content-Type` |
//! | 500 | Handler panic or missing CapabilityStatement |
//! | 504 | Request deadline exceeded |
//!
//! ## Architecture
//!
//! - [`error`] - Error types
//! - [`config`] - Server configuration
//! - [`state`] - Application state (configuration, registry, capabilities)
//! - [`middleware`] - The request pipeline and its stages
//! - [`registry`] - Resource types, interactions and handlers
//! - [`capability`] - CapabilityStatement construction and caching
//! - [`handlers`] - HTTP request handlers
//! - [`extractors`] - Axum extractors
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod capability;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fhir_types;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{ConfigError, RestError, RestResult};
pub use middleware::{Pipeline, RequestContext};
pub use registry::{Interaction, ResourceHandler, ResourceRegistry};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::Request;
use axum::{Router, ServiceExt};
use tower::{Layer, ServiceBuilder};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{RequestDeadline, catch_panic_layer, deadline_middleware, pipeline_middleware};

/// Creates the Axum application for the US Core registry.
///
/// This is a convenience function; for a custom registry use
/// [`create_app_with_registry`].
pub fn create_app(config: ServerConfig) -> Result<Router, ConfigError> {
    create_app_with_registry(config, ResourceRegistry::us_core())
}

/// Creates the Axum application for a custom registry.
///
/// Fails when the capability template cannot be loaded or does not agree
/// with the registry.
pub fn create_app_with_registry(
    config: ServerConfig,
    registry: ResourceRegistry,
) -> Result<Router, ConfigError> {
    let state = AppState::new(config, registry)?;
    Ok(create_app_with_state(state))
}

/// Creates the Axum application from prepared state.
///
/// Layers, outermost first: the request pipeline, request tracing, the
/// request deadline, panic recovery.
pub fn create_app_with_state(state: AppState) -> Router {
    let pipeline = Arc::new(Pipeline::standard(state.config()));
    let deadline = RequestDeadline::new(state.config().request_timeout());

    info!(
        resources = state.registry().len(),
        stages = ?pipeline.stage_names(),
        timeout_secs = deadline.timeout().as_secs(),
        "Creating REST API server"
    );

    let router = routing::fhir_routes::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(axum::middleware::from_fn_with_state(
            pipeline,
            pipeline_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            deadline,
            deadline_middleware,
        ))
        .layer(catch_panic_layer());

    router.layer(service_builder)
}

/// Binds the configured address and serves `app` until Ctrl-C.
///
/// Trailing slashes are trimmed before routing and the peer address is made
/// available to the pipeline.
pub async fn serve(app: Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let app = NormalizePathLayer::trim_trailing_slash().layer(app);
    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level`.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fhird_rest={level},fhird={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
