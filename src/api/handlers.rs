use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::wire::{
    EndpointCreateRequest, EndpointDoc, EndpointsDoc, Reply, TemplateDoc, TemplateRequest,
    TemplatesDoc,
};
use crate::errors::AppError;
use crate::middleware::negotiate::{Payload, Representation};
use crate::AppState;

// ── Endpoint templates ───────────────────────────────────────

/// GET /v2.0/endpointTemplates
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    representation: Representation,
) -> Result<Reply<TemplatesDoc>, AppError> {
    let endpoint_templates = state.templates.list_templates().await?;
    Ok(Reply::ok(representation, TemplatesDoc { endpoint_templates }))
}

/// GET /v2.0/endpointTemplates/:id
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Path(id): Path<String>,
) -> Result<Reply<TemplateDoc>, AppError> {
    let endpoint_template = state.templates.get_template(&id).await?;
    Ok(Reply::ok(representation, TemplateDoc { endpoint_template }))
}

/// POST /v2.0/endpointTemplates
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Payload(body): Payload<TemplateRequest>,
) -> Result<Reply<TemplateDoc>, AppError> {
    let endpoint_template = state.templates.create_template(body.endpoint_template).await?;
    Ok(Reply::created(representation, TemplateDoc { endpoint_template }))
}

/// PUT /v2.0/endpointTemplates/:id
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Path(id): Path<String>,
    Payload(body): Payload<TemplateRequest>,
) -> Result<Reply<TemplateDoc>, AppError> {
    let endpoint_template = state
        .templates
        .update_template(&id, body.endpoint_template)
        .await?;
    Ok(Reply::ok(representation, TemplateDoc { endpoint_template }))
}

/// DELETE /v2.0/endpointTemplates/:id
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.templates.delete_template(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tenant endpoints ─────────────────────────────────────────

/// GET /v2.0/tenants/:tenant/endpoints
pub async fn list_endpoints(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Path(tenant_id): Path<String>,
) -> Result<Reply<EndpointsDoc>, AppError> {
    let endpoints = state.endpoints.list_endpoints(&tenant_id).await?;
    Ok(Reply::ok(representation, EndpointsDoc { endpoints }))
}

/// POST /v2.0/tenants/:tenant/endpoints
pub async fn create_endpoint(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Path(tenant_id): Path<String>,
    Payload(body): Payload<EndpointCreateRequest>,
) -> Result<Reply<EndpointDoc>, AppError> {
    let template_id = body.endpoint_template.id();
    let endpoint = state
        .endpoints
        .create_endpoint(&tenant_id, template_id.as_deref())
        .await?;
    Ok(Reply::created(representation, EndpointDoc { endpoint }))
}

/// DELETE /v2.0/tenants/:tenant/endpoints/:id
pub async fn delete_endpoint(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, endpoint_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state
        .endpoints
        .delete_endpoint(&tenant_id, &endpoint_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
