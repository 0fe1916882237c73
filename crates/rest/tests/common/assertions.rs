//! HTTP response assertions.

use axum_test::TestResponse;
use serde_json::Value;

/// Asserts that the response carries `Content-Type: application/fhir+json`.
pub fn assert_fhir_json(response: &TestResponse) {
    let content_type = response
        .headers()
        .get("content-type")
        .expect("Response should have Content-Type header");
    assert_eq!(content_type, "application/fhir+json");
}

/// Asserts that the response has an `x-request-id` header and returns it.
pub fn assert_request_id(response: &TestResponse) -> String {
    response
        .headers()
        .get("x-request-id")
        .expect("Response should have x-request-id header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Asserts that the body is `{"error": <message>}`.
pub fn assert_error_body(body: &Value, expected: &str) {
    assert_eq!(
        body.get("error").and_then(|v| v.as_str()),
        Some(expected),
        "Unexpected error body: {}",
        body
    );
}
