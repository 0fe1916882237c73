//! Resource routing handlers.
//!
//! Each route extracts the resource type from the path and hands the request
//! to [`dispatch`], which moves it through
//! `unmatched -> validated -> dispatched -> responded`:
//!
//! 1. The resource type is looked up in the registry. Unknown types end with
//!    `404 Resource {name} not found` and no handler runs.
//! 2. The interaction is checked against the entry's declared set.
//!    Undeclared interactions end with `405`. Type-level search is always
//!    allowed.
//! 3. The entry's [`ResourceHandler`](crate::registry::ResourceHandler) produces the response.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Response,
};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::RequestContext;
use crate::registry::{ResourceAction, ResourceRequest};
use crate::state::AppState;

/// Validates a request against the registry and runs the resource handler.
pub async fn dispatch(
    state: &AppState,
    resource_type: String,
    action: ResourceAction,
    context: RequestContext,
    body: Bytes,
) -> RestResult<Response> {
    let entry = state.registry().lookup(&resource_type).inspect_err(|_| {
        debug!(
            resource_type = %resource_type,
            request_id = %context.request_id(),
            "Unknown resource type"
        );
    })?;

    if let Some(interaction) = action.interaction() {
        if !entry.supports(interaction) {
            debug!(
                resource_type = %resource_type,
                interaction = %interaction,
                request_id = %context.request_id(),
                "Interaction not declared for resource type"
            );
            return Err(RestError::InteractionNotSupported {
                resource_type,
                interaction,
            });
        }
    }

    debug!(
        resource_type = %resource_type,
        interaction = action.code(),
        request_id = %context.request_id(),
        "Dispatching to resource handler"
    );

    let handler = Arc::clone(entry.handler());
    handler
        .handle(ResourceRequest {
            resource_type,
            action,
            context,
            body,
        })
        .await
}

/// `GET [base]/[type]`
pub async fn search_type_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    ctx: RequestContext,
) -> RestResult<Response> {
    dispatch(&state, resource_type, ResourceAction::SearchType, ctx, Bytes::new()).await
}

/// `POST [base]/[type]`
pub async fn create_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    ctx: RequestContext,
    body: Bytes,
) -> RestResult<Response> {
    dispatch(&state, resource_type, ResourceAction::Create, ctx, body).await
}

/// `GET [base]/[type]/[id]`
pub async fn read_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    ctx: RequestContext,
) -> RestResult<Response> {
    dispatch(&state, resource_type, ResourceAction::Read { id }, ctx, Bytes::new()).await
}

/// `GET [base]/[type]/[id]/_history/[vid]`
pub async fn vread_handler(
    State(state): State<AppState>,
    Path((resource_type, id, version_id)): Path<(String, String, String)>,
    ctx: RequestContext,
) -> RestResult<Response> {
    dispatch(
        &state,
        resource_type,
        ResourceAction::Vread { id, version_id },
        ctx,
        Bytes::new(),
    )
    .await
}

/// `PUT [base]/[type]/[id]`
pub async fn update_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    ctx: RequestContext,
    body: Bytes,
) -> RestResult<Response> {
    dispatch(&state, resource_type, ResourceAction::Update { id }, ctx, body).await
}

/// `DELETE [base]/[type]/[id]`
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    ctx: RequestContext,
) -> RestResult<Response> {
    dispatch(&state, resource_type, ResourceAction::Delete { id }, ctx, Bytes::new()).await
}
