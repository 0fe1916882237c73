//! Query parameter parsing.
//!
//! Recognizes the FHIR result parameters `_format`, `_pretty`, `_summary`
//! and `_elements`. Other keys are ignored. Parsing never fails.
//!
//! See: <https://hl7.org/fhir/http.html#parameters>

use std::fmt;

use serde::Serialize;

use super::{RequestContext, Stage, StageOutcome};

/// Summary mode requested through `_summary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Return only elements marked as summary.
    True,
    /// Return only the text narrative and mandatory elements.
    Text,
    /// Return all elements except the text narrative.
    Data,
    /// Return only a count.
    Count,
    /// Return the full resource.
    False,
    /// `_summary` was not given.
    #[default]
    Unset,
}

impl SummaryMode {
    /// Parses a `_summary` value.
    ///
    /// Unrecognized values map to [`SummaryMode::False`] instead of being
    /// rejected. An empty value is treated as absent.
    pub fn from_param(value: &str) -> Self {
        match value {
            "" => SummaryMode::Unset,
            "true" => SummaryMode::True,
            "text" => SummaryMode::Text,
            "data" => SummaryMode::Data,
            "count" => SummaryMode::Count,
            _ => SummaryMode::False,
        }
    }

    /// Returns the parameter value, or an empty string when unset.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::True => "true",
            SummaryMode::Text => "text",
            SummaryMode::Data => "data",
            SummaryMode::Count => "count",
            SummaryMode::False => "false",
            SummaryMode::Unset => "",
        }
    }

    /// Returns true when `_summary` was not given.
    pub fn is_unset(&self) -> bool {
        matches!(self, SummaryMode::Unset)
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed result parameters, derived once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestParameters {
    /// `_format`, verbatim.
    #[serde(rename = "_format", skip_serializing_if = "Option::is_none")]
    format: Option<String>,

    /// `_pretty`: true whenever the key is present.
    #[serde(rename = "_pretty", skip_serializing_if = "std::ops::Not::not")]
    pretty: bool,

    /// `_summary`.
    #[serde(rename = "_summary", skip_serializing_if = "SummaryMode::is_unset")]
    summary: SummaryMode,

    /// `_elements`, verbatim.
    // TODO: validate the element names against the resource definition once
    // structure definitions are available to the server.
    #[serde(rename = "_elements", skip_serializing_if = "Option::is_none")]
    elements: Option<String>,
}

impl RequestParameters {
    /// Parses the recognized keys out of a raw query string.
    ///
    /// When a key repeats, the first occurrence wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        let mut seen_format = false;
        let mut seen_summary = false;
        let mut seen_elements = false;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "_format" if !seen_format => {
                    seen_format = true;
                    params.format = non_empty(&value);
                }
                "_pretty" => params.pretty = true,
                "_summary" if !seen_summary => {
                    seen_summary = true;
                    params.summary = SummaryMode::from_param(&value);
                }
                "_elements" if !seen_elements => {
                    seen_elements = true;
                    params.elements = non_empty(&value);
                }
                _ => {}
            }
        }

        params
    }

    /// Returns `_format`, if given.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Returns whether `_pretty` was given.
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    /// Returns the summary mode.
    pub fn summary(&self) -> SummaryMode {
        self.summary
    }

    /// Returns `_elements`, unvalidated.
    pub fn elements(&self) -> Option<&str> {
        self.elements.as_deref()
    }
}

impl fmt::Display for RequestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "format={} pretty={} summary={} elements={}",
            self.format().unwrap_or(""),
            self.pretty,
            self.summary,
            self.elements().unwrap_or("")
        )
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Pipeline stage that attaches [`RequestParameters`] to the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParamParser;

impl Stage for ParamParser {
    fn name(&self) -> &'static str {
        "params"
    }

    fn apply(&self, mut ctx: RequestContext) -> StageOutcome {
        ctx.parameters = RequestParameters::from_query(ctx.uri.query());
        StageOutcome::Continue(ctx)
    }
}
