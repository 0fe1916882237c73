//! The request pipeline.
//!
//! Every request passes through an ordered list of [`Stage`]s before it
//! reaches routing. A stage takes the [`RequestContext`] by value and either
//! hands it on, possibly enriched, or ends the request with a response.
//!
//! - [`stamp`] - Date, request id and real client IP
//! - [`heartbeat`] - `/ping` liveness probe
//! - [`content_type`] - Request media type enforcement
//! - [`params`] - `_format`, `_pretty`, `_summary`, `_elements`
//! - [`guard`] - Request deadline and panic recovery, applied around handlers
//!
//! [`pipeline_middleware`] drives the stages from an axum middleware. It is
//! the outermost layer, so the request is stamped before anything logs it.

pub mod content_type;
pub mod context;
pub mod guard;
pub mod heartbeat;
pub mod params;
pub mod stamp;

use std::sync::Arc;
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, debug, info, info_span};

use crate::config::ServerConfig;

pub use content_type::{ContentNegotiator, FHIR_JSON};
pub use context::RequestContext;
pub use guard::{RequestDeadline, catch_panic_layer, deadline_middleware};
pub use heartbeat::Heartbeat;
pub use params::{ParamParser, RequestParameters, SummaryMode};
pub use stamp::{DateStamp, RealIpStamp, RequestIdStamp, X_REQUEST_ID};

/// Result of applying a single stage.
pub enum StageOutcome {
    /// Hand the context to the next stage.
    Continue(RequestContext),
    /// End the request with this response. Later stages and the handler do not run.
    Respond(Response),
}

/// One step of the request pipeline.
///
/// Stages are synchronous and must not block.
pub trait Stage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Applies the stage to a request context.
    fn apply(&self, ctx: RequestContext) -> StageOutcome;
}

/// An ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// The server's pipeline, in its fixed order.
    ///
    /// Stamping runs first so every later outcome, including rejections,
    /// carries a request id. The heartbeat answers before content
    /// negotiation so probes need no FHIR headers.
    pub fn standard(config: &ServerConfig) -> Self {
        Self::new()
            .with_stage(DateStamp)
            .with_stage(RequestIdStamp)
            .with_stage(RealIpStamp)
            .with_stage(Heartbeat::default())
            .with_stage(ContentNegotiator::from_config(config))
            .with_stage(ParamParser)
    }

    /// Returns the stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order, stopping at the first terminal outcome.
    ///
    /// Response headers queued by earlier stages are applied to a terminal
    /// response.
    pub fn run(&self, mut ctx: RequestContext) -> StageOutcome {
        for stage in &self.stages {
            let mut queued = std::mem::take(&mut ctx.response_headers);
            match stage.apply(ctx) {
                StageOutcome::Continue(mut next) => {
                    queued.extend(std::mem::take(&mut next.response_headers));
                    next.response_headers = queued;
                    ctx = next;
                }
                StageOutcome::Respond(mut response) => {
                    debug!(
                        stage = stage.name(),
                        status = response.status().as_u16(),
                        "Pipeline stage ended request"
                    );
                    apply_headers(&mut response, queued);
                    return StageOutcome::Respond(response);
                }
            }
        }
        StageOutcome::Continue(ctx)
    }
}

fn apply_headers(response: &mut Response, headers: HeaderMap) {
    let target = response.headers_mut();
    let mut last = None;
    for (name, value) in headers {
        if let Some(name) = name {
            last = Some(name);
        }
        if let Some(name) = &last {
            target.insert(name.clone(), value);
        }
    }
}

/// Axum middleware driving a [`Pipeline`].
///
/// The final context is stored in the request extensions for the
/// [`RequestContext`] extractor, headers stamped by the stages replace the
/// inbound headers, and queued response headers are written over whatever the
/// handler set.
///
/// The rest of the stack runs inside an `http_request` span carrying the
/// stamped request id, so every event logged below the pipeline, including
/// timeouts and recovered panics, can be tied to the `x-request-id` the
/// client received.
pub async fn pipeline_middleware(
    State(pipeline): State<Arc<Pipeline>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let (mut parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let ctx = RequestContext::from_parts(&parts).with_body_len(body.size_hint().exact());
    let ctx = match pipeline.run(ctx) {
        StageOutcome::Continue(ctx) => ctx,
        StageOutcome::Respond(response) => {
            let request_id = response
                .headers()
                .get(&X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                request_id = %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request answered by pipeline"
            );
            return response;
        }
    };

    let span = info_span!(
        "http_request",
        method = %method,
        path = %path,
        request_id = %ctx.request_id
    );

    parts.headers = ctx.headers.clone();
    let response_headers = ctx.response_headers.clone();
    let request_id = ctx.request_id.clone();
    let remote_addr = ctx.remote_addr;
    parts.extensions.insert(ctx);

    let mut response = next
        .run(Request::from_parts(parts, body))
        .instrument(span.clone())
        .await;
    apply_headers(&mut response, response_headers);

    span.in_scope(|| {
        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            request_id = %request_id,
            remote_addr = ?remote_addr,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        )
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method, StatusCode, Uri, header};

    #[test]
    fn test_standard_order() {
        let pipeline = Pipeline::standard(&ServerConfig::default());
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "date",
                "request-id",
                "real-ip",
                "heartbeat",
                "content-type",
                "params"
            ]
        );
    }

    #[test]
    fn test_run_enriches_context() {
        let pipeline = Pipeline::standard(&ServerConfig::default());
        let ctx = RequestContext::new(Method::GET, "/Patient?_summary=count".parse().unwrap());

        match pipeline.run(ctx) {
            StageOutcome::Continue(ctx) => {
                assert!(!ctx.request_id().is_empty());
                assert!(ctx.headers().contains_key(header::DATE));
                assert_eq!(ctx.parameters().summary(), SummaryMode::Count);
                assert_eq!(
                    ctx.response_headers().get(header::CONTENT_TYPE).unwrap(),
                    FHIR_JSON
                );
                assert_eq!(
                    ctx.response_headers().get(&X_REQUEST_ID).unwrap(),
                    ctx.request_id()
                );
            }
            StageOutcome::Respond(_) => panic!("GET /Patient should pass the pipeline"),
        }
    }

    #[test]
    fn test_terminal_response_carries_request_id() {
        let pipeline = Pipeline::standard(&ServerConfig::default());
        let ctx = RequestContext::new(Method::POST, Uri::from_static("/Patient")).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain"),
        );

        match pipeline.run(ctx) {
            StageOutcome::Respond(response) => {
                assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
                assert!(response.headers().contains_key(&X_REQUEST_ID));
            }
            StageOutcome::Continue(_) => panic!("text/plain should be rejected"),
        }
    }

    #[test]
    fn test_stops_at_first_terminal_stage() {
        struct Stop;
        impl Stage for Stop {
            fn name(&self) -> &'static str {
                "stop"
            }
            fn apply(&self, _ctx: RequestContext) -> StageOutcome {
                StageOutcome::Respond(Response::new(axum::body::Body::empty()))
            }
        }

        let pipeline = Pipeline::new().with_stage(Stop).with_stage(ParamParser);
        let ctx = RequestContext::new(Method::GET, Uri::from_static("/Patient"));
        assert!(matches!(pipeline.run(ctx), StageOutcome::Respond(_)));
    }
}
