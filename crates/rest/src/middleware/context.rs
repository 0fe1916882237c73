//! Per-request context.
//!
//! A [`RequestContext`] is created by the pipeline driver for every inbound
//! request, enriched by the pipeline stages in order, and then handed to the
//! handler through the [`RequestContext`] extractor. It is owned by the
//! request's task and dropped when the request ends.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, header, request::Parts};
use chrono::{DateTime, Utc};

use super::params::RequestParameters;

/// Request-scoped state shared between pipeline stages and handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub(crate) request_id: String,
    pub(crate) remote_addr: Option<IpAddr>,
    pub(crate) socket_addr: Option<SocketAddr>,
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) parameters: RequestParameters,
    pub(crate) response_headers: HeaderMap,
    pub(crate) body_len: Option<u64>,
}

impl RequestContext {
    /// Creates a context from the request head, stamped with the current time.
    pub fn from_parts(parts: &Parts) -> Self {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request_id: String::new(),
            remote_addr: socket_addr.map(|addr| addr.ip()),
            socket_addr,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            timestamp: Utc::now(),
            parameters: RequestParameters::default(),
            response_headers: HeaderMap::new(),
            body_len: None,
        }
    }

    /// Creates a context for a bare method and URI, as used in tests.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            request_id: String::new(),
            remote_addr: None,
            socket_addr: None,
            method,
            uri,
            headers: HeaderMap::new(),
            timestamp: Utc::now(),
            parameters: RequestParameters::default(),
            response_headers: HeaderMap::new(),
            body_len: None,
        }
    }

    /// Adds a request header, replacing any existing value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Records the exact body length, when known.
    pub fn with_body_len(mut self, len: Option<u64>) -> Self {
        self.body_len = len;
        self
    }

    /// Sets the socket address the request arrived from.
    pub fn with_socket_addr(mut self, addr: SocketAddr) -> Self {
        self.socket_addr = Some(addr);
        self.remote_addr = Some(addr.ip());
        self
    }

    /// Returns the request id assigned by the pipeline.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the client address: proxy-provided when present, else the socket address.
    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    /// Returns the socket address of the connection, if known.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.socket_addr
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers, including headers stamped by the pipeline.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the time the request entered the pipeline.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the parsed query parameters.
    pub fn parameters(&self) -> &RequestParameters {
        &self.parameters
    }

    /// Returns the `Host` header, if any.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the `User-Agent` header, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the exact request body length, when known.
    pub fn body_len(&self) -> Option<u64> {
        self.body_len
    }

    /// Returns the headers queued for the response.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }
}
