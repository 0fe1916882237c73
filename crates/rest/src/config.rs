//! Server configuration for the FHIR REST API.
//!
//! Configuration is parsed once at startup, from command line arguments with
//! environment variable fallbacks, and then shared read-only.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FHIRD_PORT` | 9292 | Server port |
//! | `FHIRD_HOST` | 127.0.0.1 | Host to bind |
//! | `FHIRD_LOG_LEVEL` | info | Log level |
//! | `FHIRD_REQUEST_TIMEOUT` | 60 | Request deadline (seconds) |
//! | `FHIRD_BASE_URL` | http://localhost:9292 | Server base URL, advertised in the CapabilityStatement |
//! | `FHIRD_CAPABILITY_TEMPLATE` | (embedded) | Path to a capability template JSON file |
//! | `FHIRD_ACCEPTED_CONTENT_TYPES` | application/fhir+json,application/json,application/json+fhir | Accepted request media types |
//! | `FHIRD_ACCEPT_LEGACY_XML` | false | Also accept `application/xml+fhir` |
//!
//! # Example
//!
//! ```rust
//! use fhird_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const DEFAULT_ACCEPTED_CONTENT_TYPES: &str =
    "application/fhir+json,application/json,application/json+fhir";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Server configuration for the FHIR REST API.
#[derive(Debug, Clone, Parser)]
#[command(name = "fhird")]
#[command(about = "Experimental HL7 FHIR R4 server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "FHIRD_PORT", default_value = "9292")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "FHIRD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "FHIRD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request deadline in seconds.
    #[arg(long, env = "FHIRD_REQUEST_TIMEOUT", default_value = "60")]
    pub request_timeout: u64,

    /// Base URL for the server (advertised as the CapabilityStatement url).
    #[arg(long, env = "FHIRD_BASE_URL", default_value = "http://localhost:9292")]
    pub base_url: String,

    /// Capability template JSON file. The embedded template is used when unset.
    #[arg(long, env = "FHIRD_CAPABILITY_TEMPLATE")]
    pub capability_template: Option<PathBuf>,

    /// Accepted request media types (comma-separated).
    #[arg(
        long,
        env = "FHIRD_ACCEPTED_CONTENT_TYPES",
        value_delimiter = ',',
        default_value = DEFAULT_ACCEPTED_CONTENT_TYPES
    )]
    pub accepted_content_types: Vec<String>,

    /// Also accept the legacy `application/xml+fhir` media type.
    #[arg(long, env = "FHIRD_ACCEPT_LEGACY_XML", default_value = "false")]
    pub accept_legacy_xml: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9292,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 60,
            base_url: "http://localhost:9292".to_string(),
            capability_template: None,
            accepted_content_types: DEFAULT_ACCEPTED_CONTENT_TYPES
                .split(',')
                .map(String::from)
                .collect(),
            accept_legacy_xml: false,
        }
    }
}

impl ServerConfig {
    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if let Err(e) = url::Url::parse(&self.base_url) {
            errors.push(format!("Base URL '{}' is invalid: {}", self.base_url, e));
        }

        if self.accepted_content_types.iter().all(|m| m.trim().is_empty()) {
            errors.push("At least one accepted content type is required".to_string());
        }

        for media_type in &self.accepted_content_types {
            let media_type = media_type.trim();
            if !media_type.is_empty() && media_type.parse::<mime::Mime>().is_err() {
                errors.push(format!("Accepted content type '{}' is invalid", media_type));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses ephemeral port 0 and a short deadline.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: 5,
            base_url: "http://localhost:0".to_string(),
            ..Self::default()
        }
    }
}
