//! Request pipeline tests.
//!
//! Exercises the stages through the full application:
//! - Request id assignment and propagation
//! - Content negotiation and the forced response Content-Type
//! - Query parameter parsing
//! - The `/ping` heartbeat

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use common::assertions::{assert_error_body, assert_fhir_json, assert_request_id};
use common::harness::test_server;

const CONTENT_TYPE: HeaderName = HeaderName::from_static("content-type");
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

// =============================================================================
// Concrete scenario
// =============================================================================

#[tokio::test]
async fn test_search_with_summary_and_pretty() {
    let server = test_server();

    let response = server
        .get("/Patient")
        .add_query_param("_summary", "true")
        .add_query_param("_pretty", "1")
        .add_header(CONTENT_TYPE, HeaderValue::from_static("application/fhir+json"))
        .await;

    response.assert_status_ok();
    assert_fhir_json(&response);

    let body: Value = response.json();
    assert_eq!(body["resourceType"], "Patient");
    assert_eq!(body["parameters"], json!({"_summary": "true", "_pretty": true}));
}

// =============================================================================
// Parameter parsing
// =============================================================================

mod params {
    use super::*;

    async fn parameters(query: &str) -> Value {
        let server = test_server();
        let response = server.get(&format!("/Observation?{query}")).await;
        response.assert_status_ok();
        response.json::<Value>()["parameters"].clone()
    }

    #[tokio::test]
    async fn test_summary_count() {
        assert_eq!(parameters("_summary=count").await["_summary"], "count");
    }

    #[tokio::test]
    async fn test_unknown_summary_is_false() {
        assert_eq!(parameters("_summary=bogus").await["_summary"], "false");
    }

    #[tokio::test]
    async fn test_pretty_absent_and_present() {
        assert!(parameters("code=1234-5").await.get("_pretty").is_none());
        assert_eq!(parameters("_pretty=false").await["_pretty"], true);
    }

    #[tokio::test]
    async fn test_format_and_elements_passed_through() {
        let params = parameters("_format=json&_elements=code,value").await;
        assert_eq!(params["_format"], "json");
        assert_eq!(params["_elements"], "code,value");
    }
}

// =============================================================================
// Content negotiation
// =============================================================================

mod content_type {
    use super::*;

    #[tokio::test]
    async fn test_text_plain_rejected() {
        let server = test_server();

        let response = server
            .get("/Patient")
            .add_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_error_body(&response.json(), "Content type 'text/plain' is not supported");
        assert_request_id(&response);
    }

    #[tokio::test]
    async fn test_charset_suffix_accepted() {
        let server = test_server();

        let response = server
            .get("/Patient")
            .add_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/fhir+json; charset=utf-8"),
            )
            .await;

        response.assert_status_ok();
        assert_fhir_json(&response);
    }

    #[tokio::test]
    async fn test_legacy_json_fhir_accepted() {
        let server = test_server();

        let response = server
            .get("/Patient")
            .add_header(CONTENT_TYPE, HeaderValue::from_static("application/json+fhir"))
            .await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_empty_content_type_reports_value() {
        let server = test_server();

        let response = server
            .get("/Patient")
            .add_header(CONTENT_TYPE, HeaderValue::from_static(""))
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_error_body(&response.json(), "Content type '' is not supported");
    }

    #[tokio::test]
    async fn test_body_without_content_type_rejected() {
        let server = test_server();

        let response = server.post("/Patient").bytes("{}".into()).await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(response.json::<Value>()["error"].is_string());
    }

    #[tokio::test]
    async fn test_text_body_rejected_before_routing() {
        let server = test_server();

        // Unknown resource type, but negotiation runs first
        let response = server.post("/Unknown").text("hello").await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_error_responses_forced_to_fhir_json() {
        let server = test_server();

        let response = server.get("/Unknown").await;

        response.assert_status_not_found();
        assert_fhir_json(&response);
    }
}

// =============================================================================
// Request id
// =============================================================================

mod request_id {
    use super::*;

    #[tokio::test]
    async fn test_generated_when_absent() {
        let server = test_server();

        let response = server.get("/Patient").await;

        let id = assert_request_id(&response);
        assert!(Uuid::parse_str(&id).is_ok(), "expected a UUID, got {id}");
    }

    #[tokio::test]
    async fn test_inbound_id_propagated() {
        let server = test_server();

        let response = server
            .get("/Patient")
            .add_header(X_REQUEST_ID, HeaderValue::from_static("trace-42"))
            .await;

        assert_eq!(assert_request_id(&response), "trace-42");
    }

    #[tokio::test]
    async fn test_ids_differ_between_requests() {
        let server = test_server();

        let first = assert_request_id(&server.get("/Patient").await);
        let second = assert_request_id(&server.get("/Patient").await);
        assert_ne!(first, second);
    }
}

// =============================================================================
// Heartbeat
// =============================================================================

mod heartbeat {
    use super::*;

    #[tokio::test]
    async fn test_ping() {
        let server = test_server();

        let response = server.get("/ping").await;

        response.assert_status_ok();
        assert_eq!(response.text(), ".");
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
        assert_request_id(&response);
    }

    #[tokio::test]
    async fn test_ping_ignores_content_type() {
        let server = test_server();

        let response = server
            .get("/ping")
            .add_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .await;

        response.assert_status_ok();
    }
}
