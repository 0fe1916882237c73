//! Placeholder resource handler.
//!
//! Resource persistence is not part of this server yet. Every registered
//! resource type is served by [`PlaceholderHandler`], which acknowledges the
//! validated request with a fixed body.

use async_trait::async_trait;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::RestResult;
use crate::registry::{ResourceAction, ResourceHandler, ResourceRequest};

/// Answers every routed request with `200` and a description of the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderHandler;

#[async_trait]
impl ResourceHandler for PlaceholderHandler {
    async fn handle(&self, request: ResourceRequest) -> RestResult<Response> {
        debug!(
            resource_type = %request.resource_type,
            interaction = request.action.code(),
            request_id = %request.context.request_id(),
            "Placeholder handler answering"
        );
        Ok((StatusCode::OK, Json(placeholder_body(&request))).into_response())
    }
}

fn placeholder_body(request: &ResourceRequest) -> Value {
    let resource_type = &request.resource_type;
    let mut body = Map::new();
    body.insert("resourceType".into(), json!(resource_type));
    body.insert("interaction".into(), json!(request.action.code()));

    let message = match &request.action {
        ResourceAction::SearchType => format!("{resource_type} Search"),
        ResourceAction::Read { id } => {
            body.insert("id".into(), json!(id));
            format!("{resource_type} Read")
        }
        ResourceAction::Vread { id, version_id } => {
            body.insert("id".into(), json!(id));
            body.insert("versionId".into(), json!(version_id));
            format!("{resource_type} Version Read")
        }
        ResourceAction::Update { id } => {
            body.insert("id".into(), json!(id));
            format!("{resource_type} Update")
        }
        ResourceAction::Delete { id } => {
            body.insert("id".into(), json!(id));
            format!("{resource_type} Delete")
        }
        ResourceAction::Create => format!("{resource_type} Create"),
    };
    body.insert("message".into(), json!(message));
    body.insert(
        "parameters".into(),
        serde_json::to_value(request.context.parameters()).unwrap_or(Value::Null),
    );

    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{Method, Uri};

    use crate::middleware::{ParamParser, RequestContext, Stage, StageOutcome};

    fn request(action: ResourceAction, uri: &'static str) -> ResourceRequest {
        let ctx = RequestContext::new(Method::GET, Uri::from_static(uri));
        let context = match ParamParser.apply(ctx) {
            StageOutcome::Continue(ctx) => ctx,
            StageOutcome::Respond(_) => unreachable!(),
        };
        ResourceRequest {
            resource_type: "Patient".to_string(),
            action,
            context,
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_search_body() {
        let body = placeholder_body(&request(
            ResourceAction::SearchType,
            "/Patient?_summary=true&_pretty=1",
        ));
        assert_eq!(body["resourceType"], "Patient");
        assert_eq!(body["interaction"], "search-type");
        assert_eq!(body["message"], "Patient Search");
        assert_eq!(
            body["parameters"],
            json!({"_summary": "true", "_pretty": true})
        );
    }

    #[test]
    fn test_vread_body_carries_ids() {
        let body = placeholder_body(&request(
            ResourceAction::Vread {
                id: "123".into(),
                version_id: "2".into(),
            },
            "/Patient/123/_history/2",
        ));
        assert_eq!(body["id"], "123");
        assert_eq!(body["versionId"], "2");
        assert_eq!(body["interaction"], "vread");
    }

    #[tokio::test]
    async fn test_handle_returns_ok() {
        let response = PlaceholderHandler
            .handle(request(ResourceAction::Read { id: "1".into() }, "/Patient/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
