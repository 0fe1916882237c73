//! REST API test harness.
//!
//! Builds the fully layered application (pipeline, deadline, panic recovery,
//! router) and wraps it in an `axum_test::TestServer`.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_test::TestServer;
use serde_json::json;
use tracing::subscriber::DefaultGuard;

use fhird_rest::registry::{ResourceRegistry, ResourceRequest};
use fhird_rest::{
    AppState, Interaction, ResourceHandler, RestResult, ServerConfig, create_app_with_registry,
    create_app_with_state,
};

/// Creates a test server for the US Core registry.
pub fn test_server() -> TestServer {
    test_server_with(ServerConfig::for_testing(), ResourceRegistry::us_core())
}

/// Creates a test server for a configuration and registry.
pub fn test_server_with(config: ServerConfig, registry: ResourceRegistry) -> TestServer {
    let app = create_app_with_registry(config, registry).expect("Failed to create app");
    TestServer::new(app).expect("Failed to create test server")
}

/// Creates a test server from prepared state.
pub fn test_server_with_state(state: AppState) -> TestServer {
    TestServer::new(create_app_with_state(state)).expect("Failed to create test server")
}

/// Handler that sleeps before answering.
pub struct SlowHandler {
    pub delay: Duration,
}

#[async_trait]
impl ResourceHandler for SlowHandler {
    async fn handle(&self, request: ResourceRequest) -> RestResult<Response> {
        tokio::time::sleep(self.delay).await;
        Ok((
            StatusCode::OK,
            axum::Json(json!({"resourceType": request.resource_type, "slow": true})),
        )
            .into_response())
    }
}

/// Handler that always panics.
pub struct PanickingHandler;

#[async_trait]
impl ResourceHandler for PanickingHandler {
    async fn handle(&self, _request: ResourceRequest) -> RestResult<Response> {
        panic!("handler exploded")
    }
}

/// US Core registry plus a `Slow` and a `Crash` resource type.
pub fn registry_with_test_handlers(delay: Duration) -> ResourceRegistry {
    ResourceRegistry::builder()
        .register_us_core()
        .register(
            "Slow",
            Interaction::DECLARED_BY_DEFAULT,
            Arc::new(SlowHandler { delay }),
        )
        .register(
            "Crash",
            Interaction::DECLARED_BY_DEFAULT,
            Arc::new(PanickingHandler),
        )
        .build()
        .expect("Failed to build registry")
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Returns the first captured line containing `needle`.
    pub fn line_containing(&self, needle: &str) -> Option<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .find(|line| line.contains(needle))
            .map(String::from)
    }
}

/// Sends this thread's log events to a [`LogCapture`] until the guard drops.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}
