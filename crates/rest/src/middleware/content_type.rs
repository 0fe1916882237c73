//! Content negotiation stage.
//!
//! Rejects requests whose `Content-Type` is outside the accepted set and
//! forces `application/fhir+json` onto every response that gets past it.

use std::collections::BTreeSet;

use axum::http::{HeaderValue, header};
use axum::response::IntoResponse;
use mime::Mime;
use tracing::debug;

use super::{RequestContext, Stage, StageOutcome};
use crate::config::ServerConfig;
use crate::error::RestError;

/// Media type forced onto responses.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Legacy DSTU2 XML media type, accepted only when enabled in config.
pub const LEGACY_FHIR_XML: &str = "application/xml+fhir";

/// Pipeline stage enforcing the accepted request media types.
///
/// A request passes when it carries an accepted `Content-Type`, compared by
/// essence and case-insensitively, or when it carries neither a
/// `Content-Type` nor a body.
#[derive(Debug, Clone)]
pub struct ContentNegotiator {
    accepted: BTreeSet<String>,
}

impl ContentNegotiator {
    /// Creates a negotiator accepting the given media types.
    pub fn new<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted = accepted
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { accepted }
    }

    /// Creates a negotiator from the configured media types.
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut negotiator = Self::new(&config.accepted_content_types);
        if config.accept_legacy_xml {
            negotiator.accepted.insert(LEGACY_FHIR_XML.to_string());
        }
        negotiator
    }

    /// Returns the accepted media types, lowercased.
    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        self.accepted.iter().map(String::as_str)
    }

    /// Returns true if a raw `Content-Type` value is accepted.
    ///
    /// Parameters such as `charset` are ignored.
    pub fn is_accepted(&self, content_type: &str) -> bool {
        content_type
            .parse::<Mime>()
            .map(|m| self.accepted.contains(&m.essence_str().to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

impl Stage for ContentNegotiator {
    fn name(&self) -> &'static str {
        "content-type"
    }

    fn apply(&self, mut ctx: RequestContext) -> StageOutcome {
        let rejected = match ctx.headers.get(header::CONTENT_TYPE) {
            Some(value) => match value.to_str() {
                Ok(content_type) if self.is_accepted(content_type) => None,
                Ok(content_type) => Some(RestError::UnsupportedMediaType {
                    content_type: content_type.to_string(),
                }),
                Err(_) => Some(RestError::UnsupportedMediaType {
                    content_type: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                }),
            },
            None if has_body(&ctx) => Some(RestError::MissingContentType),
            None => None,
        };

        if let Some(err) = rejected {
            debug!(
                method = %ctx.method,
                path = %ctx.uri.path(),
                error = %err,
                "Rejecting request media type"
            );
            return StageOutcome::Respond(err.into_response());
        }

        ctx.response_headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON));
        StageOutcome::Continue(ctx)
    }
}

fn has_body(ctx: &RequestContext) -> bool {
    if ctx.headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    ctx.headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or(ctx.body_len)
        .is_some_and(|len| len > 0)
}
