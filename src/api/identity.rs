//! Tokens, tenants and users: just enough directory to own endpoints and
//! issue credentials.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;

use super::wire::{
    AuthDoc, AuthRequest, Reply, TenantDoc, TenantRequest, UserDoc, UserEnabledRequest,
    UserRequest,
};
use crate::errors::AppError;
use crate::middleware::negotiate::{Payload, Representation};
use crate::models::directory::{
    hash_password, verify_password, verify_unknown_principal, Tenant, User,
};
use crate::models::token::{mask, Token};
use crate::store::{DirectoryStore, StoreError, TokenStore};
use crate::AppState;

// ── Tokens ───────────────────────────────────────────────────

/// POST /v2.0/tokens
///
/// Not gated: this is how a caller obtains a credential.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Payload(body): Payload<AuthRequest>,
) -> Result<Reply<AuthDoc>, AppError> {
    let creds = body.password_credentials;
    let rejected = || AppError::Unauthorized("invalid username or password".into());

    let Some(user) = state.store.get_user(&creds.username).await? else {
        verify_unknown_principal(&creds.password);
        return Err(rejected());
    };
    if !verify_password(&user.password_hash, &creds.password) {
        tracing::warn!(user_id = %user.id, "authentication failed: bad password");
        return Err(rejected());
    }
    if !user.enabled {
        return Err(AppError::Forbidden(format!("user {} is disabled", user.id)));
    }

    let tenant_id = match creds.tenant_id.filter(|t| !t.is_empty()) {
        Some(requested) if user.tenant_id.as_deref() != Some(requested.as_str()) => {
            tracing::warn!(user_id = %user.id, tenant_id = %requested, "authentication failed: tenant mismatch");
            return Err(AppError::Unauthorized(format!(
                "user {} has no access to tenant {}",
                user.id, requested
            )));
        }
        Some(requested) => Some(requested),
        None => user.tenant_id.clone(),
    };

    let token = Token::issue(
        &user.id,
        tenant_id.as_deref(),
        state.config.token_ttl(),
        Utc::now(),
    );
    let token = state.store.insert_token(token).await?;
    tracing::info!(user_id = %user.id, token = %mask(&token.id), "token issued");

    Ok(Reply::ok(
        representation,
        AuthDoc::new(token.id, token.expires_at, token.tenant_id),
    ))
}

/// DELETE /v2.0/tokens/:id
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_token(&id).await? {
        return Err(AppError::NotFound("token not found".into()));
    }
    tracing::info!(token = %mask(&id), "token destroyed");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tenants ──────────────────────────────────────────────────

/// POST /v2.0/tenants
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Payload(body): Payload<TenantRequest>,
) -> Result<Reply<TenantDoc>, AppError> {
    let id = body.tenant.id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::BadRequest("tenant id is required".into()));
    }
    let tenant = state
        .store
        .insert_tenant(Tenant {
            id,
            description: body.tenant.description,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict("tenant already exists".into()),
            other => other.into(),
        })?;
    tracing::info!(tenant_id = %tenant.id, "tenant created");
    Ok(Reply::created(representation, TenantDoc { tenant }))
}

/// GET /v2.0/tenants/:id
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Path(id): Path<String>,
) -> Result<Reply<TenantDoc>, AppError> {
    let tenant = state
        .store
        .get_tenant(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tenant {} not found", id)))?;
    Ok(Reply::ok(representation, TenantDoc { tenant }))
}

/// DELETE /v2.0/tenants/:id
///
/// The tenant's endpoints go with it.
pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_tenant(&id).await? {
        return Err(AppError::NotFound(format!("tenant {} not found", id)));
    }
    tracing::info!(tenant_id = %id, "tenant deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Users ────────────────────────────────────────────────────

/// POST /v2.0/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Payload(body): Payload<UserRequest>,
) -> Result<Reply<UserDoc>, AppError> {
    let spec = body.user;
    let id = spec.id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::BadRequest("user id is required".into()));
    }
    if spec.password.is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }
    let tenant_id = spec.tenant_id.filter(|t| !t.is_empty());
    if let Some(tenant_id) = &tenant_id {
        if state.store.get_tenant(tenant_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "tenant {} does not exist",
                tenant_id
            )));
        }
    }

    let user = state
        .store
        .insert_user(User {
            id,
            tenant_id,
            email: spec.email,
            password_hash: hash_password(&spec.password),
            enabled: spec.enabled.unwrap_or(true),
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict("user already exists".into()),
            other => other.into(),
        })?;
    tracing::info!(user_id = %user.id, "user created");
    Ok(Reply::created(representation, UserDoc { user }))
}

/// DELETE /v2.0/users/:id
///
/// The user's tokens go with it.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_user(&id).await? {
        return Err(AppError::NotFound(format!("user {} not found", id)));
    }
    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v2.0/users/:id/enabled
pub async fn set_user_enabled(
    State(state): State<Arc<AppState>>,
    representation: Representation,
    Path(id): Path<String>,
    Payload(body): Payload<UserEnabledRequest>,
) -> Result<Reply<UserDoc>, AppError> {
    let user = state
        .store
        .set_user_enabled(&id, body.user.enabled)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;
    tracing::info!(user_id = %user.id, enabled = user.enabled, "user enabled flag changed");
    Ok(Reply::ok(representation, UserDoc { user }))
}
