//! Request stamping stages.
//!
//! These run first in the pipeline and always succeed. Later stages and
//! handlers rely on the values they stamp.

use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use chrono::SecondsFormat;
use uuid::Uuid;

use super::{RequestContext, Stage, StageOutcome};

/// Header carrying the request id, inbound and outbound.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

static TRUE_CLIENT_IP: HeaderName = HeaderName::from_static("true-client-ip");
static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Longest inbound request id that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Stamps the request `Date` header with the pipeline timestamp in RFC 3339 UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateStamp;

impl Stage for DateStamp {
    fn name(&self) -> &'static str {
        "date"
    }

    fn apply(&self, mut ctx: RequestContext) -> StageOutcome {
        let stamp = ctx.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        if let Ok(value) = HeaderValue::from_str(&stamp) {
            ctx.headers.insert(header::DATE, value);
        }
        StageOutcome::Continue(ctx)
    }
}

/// Assigns a request id, reusing a well-formed inbound `X-Request-Id`.
///
/// The id is echoed on the response.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdStamp;

impl Stage for RequestIdStamp {
    fn name(&self) -> &'static str {
        "request-id"
    }

    fn apply(&self, mut ctx: RequestContext) -> StageOutcome {
        let inbound = ctx
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| is_valid_request_id(id))
            .map(String::from);

        let request_id = inbound.unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            ctx.headers.insert(X_REQUEST_ID.clone(), value.clone());
            ctx.response_headers.insert(X_REQUEST_ID.clone(), value);
        }
        ctx.request_id = request_id;
        StageOutcome::Continue(ctx)
    }
}

fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic())
}

/// Resolves the real client address from proxy headers.
///
/// Precedence: `True-Client-IP`, `X-Real-IP`, then the first entry of
/// `X-Forwarded-For`. Values that do not parse as an IP address are skipped.
/// Without a usable header the socket address is kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealIpStamp;

impl Stage for RealIpStamp {
    fn name(&self) -> &'static str {
        "real-ip"
    }

    fn apply(&self, mut ctx: RequestContext) -> StageOutcome {
        if let Some(ip) = forwarded_ip(&ctx.headers) {
            ctx.remote_addr = Some(ip);
        }
        StageOutcome::Continue(ctx)
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip(&TRUE_CLIENT_IP)
        .or_else(|| header_ip(&X_REAL_IP))
        .or_else(|| {
            headers
                .get(&X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok())
        })
}
