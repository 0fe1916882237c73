//! Error types for the FHIR REST API.
//!
//! Two families of errors exist:
//!
//! - [`RestError`] is request-scoped. It is always terminal for the request
//!   that raised it and is rendered as a JSON body `{"error": "..."}`.
//! - [`ConfigError`] is raised while the server is being assembled. It is
//!   fatal: the server never starts in a partially initialized state.
//!
//! # Error Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | UnknownResource | 404 |
//! | NotFound | 404 |
//! | MethodNotAllowed | 405 |
//! | InteractionNotSupported | 405 |
//! | UnsupportedMediaType | 415 |
//! | MissingContentType | 415 |
//! | CapabilityUnavailable | 500 |
//! | InternalError | 500 |
//! | Timeout | 504 |

use std::fmt;
use std::path::PathBuf;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::registry::Interaction;

/// The primary error type for REST API operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// The path names a resource type that is not registered (HTTP 404).
    UnknownResource {
        /// The resource type taken from the path.
        resource_type: String,
    },

    /// No route matched the request path (HTTP 404).
    NotFound,

    /// A route matched the path but not the method (HTTP 405).
    MethodNotAllowed,

    /// The resource type is registered but does not declare the interaction (HTTP 405).
    InteractionNotSupported {
        /// The resource type.
        resource_type: String,
        /// The interaction that was attempted.
        interaction: Interaction,
    },

    /// The request body media type is not accepted (HTTP 415).
    UnsupportedMediaType {
        /// The rejected `Content-Type` value, verbatim.
        content_type: String,
    },

    /// The request has a body but no `Content-Type` header (HTTP 415).
    MissingContentType,

    /// The handler did not finish before the deadline (HTTP 504).
    Timeout {
        /// The deadline in seconds.
        seconds: u64,
    },

    /// The cached capability document is empty or was never built (HTTP 500).
    CapabilityUnavailable,

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::UnknownResource { .. } | RestError::NotFound => StatusCode::NOT_FOUND,
            RestError::MethodNotAllowed | RestError::InteractionNotSupported { .. } => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            RestError::UnsupportedMediaType { .. } | RestError::MissingContentType => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            RestError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RestError::CapabilityUnavailable | RestError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::UnknownResource { resource_type } => {
                write!(f, "Resource {} not found", resource_type)
            }
            RestError::NotFound => write!(f, "Not Found"),
            RestError::MethodNotAllowed => write!(f, "Not Allowed"),
            RestError::InteractionNotSupported {
                resource_type,
                interaction,
            } => {
                write!(
                    f,
                    "Interaction {} is not supported for {}",
                    interaction, resource_type
                )
            }
            RestError::MissingContentType => write!(f, "Missing Content-Type for request body"),
            RestError::UnsupportedMediaType { content_type } => {
                write!(f, "Content type '{}' is not supported", content_type)
            }
            RestError::Timeout { seconds } => {
                write!(f, "Request did not complete within {}s", seconds)
            }
            RestError::CapabilityUnavailable => write!(f, "CapabilityStatement not found"),
            RestError::InternalError { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RestError {}

/// JSON body rendered for every request-scoped error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable description of the failure.
    pub error: String,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;

/// Errors raised while assembling the server at startup.
// Variant fields are self-documenting via their #[error(...)] messages
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The capability template file could not be read.
    #[error("failed to read capability template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The capability template is not valid JSON or is missing fields.
    #[error("failed to parse capability template {origin}: {source}")]
    TemplateParse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// The capability template parsed but describes something unusable.
    #[error("invalid capability template {origin}: {message}")]
    TemplateInvalid { origin: String, message: String },

    /// The capability document could not be serialized.
    #[error("failed to serialize capability document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A resource type was registered twice.
    #[error("resource type {0} is registered more than once")]
    DuplicateResource(String),

    /// A resource type name is empty or contains a path separator.
    #[error("invalid resource type name '{0}'")]
    InvalidResourceName(String),

    /// The capability document and the registry disagree on resource types.
    #[error("capability document and registry disagree on resource types: {0}")]
    RegistryMismatch(String),

    /// Configuration values failed validation.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resource_display() {
        let err = RestError::UnknownResource {
            resource_type: "Unknown".to_string(),
        };
        assert_eq!(err.to_string(), "Resource Unknown not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_router_fallback_messages() {
        assert_eq!(RestError::NotFound.to_string(), "Not Found");
        assert_eq!(RestError::MethodNotAllowed.to_string(), "Not Allowed");
        assert_eq!(
            RestError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_unsupported_media_type() {
        let err = RestError::UnsupportedMediaType {
            content_type: "text/plain".to_string(),
        };
        assert!(err.to_string().contains("text/plain"));
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let empty = RestError::UnsupportedMediaType {
            content_type: String::new(),
        };
        assert_eq!(empty.to_string(), "Content type '' is not supported");

        let missing = RestError::MissingContentType;
        assert!(missing.to_string().contains("Missing Content-Type"));
        assert_eq!(missing.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_timeout_is_gateway_timeout() {
        let err = RestError::Timeout { seconds: 6 };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.to_string().contains("6s"));
    }

    #[test]
    fn test_interaction_not_supported() {
        let err = RestError::InteractionNotSupported {
            resource_type: "Patient".to_string(),
            interaction: Interaction::Create,
        };
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            err.to_string(),
            "Interaction create is not supported for Patient"
        );
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let response = RestError::CapabilityUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "CapabilityStatement not found");
    }

    #[test]
    fn test_config_error_invalid_joins_messages() {
        let err = ConfigError::Invalid(vec!["Port cannot be 0".into(), "bad url".into()]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: Port cannot be 0; bad url"
        );
    }
}
