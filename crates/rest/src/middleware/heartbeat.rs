//! Liveness probe.
//!
//! Answers `GET`/`HEAD /ping` inside the pipeline, before content
//! negotiation, so probes never need FHIR headers.

use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;

use super::{RequestContext, Stage, StageOutcome};

/// Default liveness path.
pub const PING_PATH: &str = "/ping";

/// Pipeline stage that short-circuits liveness probes with `200 .`.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    path: String,
}

impl Heartbeat {
    /// Creates a heartbeat answering on `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the probe path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(PING_PATH)
    }
}

impl Stage for Heartbeat {
    fn name(&self) -> &'static str {
        "heartbeat"
    }

    fn apply(&self, ctx: RequestContext) -> StageOutcome {
        let is_probe = (ctx.method == Method::GET || ctx.method == Method::HEAD)
            && ctx.uri.path() == self.path;

        if is_probe {
            let response = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain")],
                ".",
            )
                .into_response();
            StageOutcome::Respond(response)
        } else {
            StageOutcome::Continue(ctx)
        }
    }
}
