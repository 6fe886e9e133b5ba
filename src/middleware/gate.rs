//! Authorization Gate.
//!
//! One middleware in front of every protected route. It classifies the
//! `X-Auth-Token` credential and maps the result to an outcome with the same
//! table for every operation:
//!
//! | TokenState   | Outcome      | Status |
//! |--------------|--------------|--------|
//! | Valid        | Allowed      | (handler runs) |
//! | Disabled     | Forbidden    | 403 |
//! | Expired      | Forbidden    | 403 |
//! | Missing      | Unauthorized | 401 |
//! | Unrecognized | NotFound     | 404 |
//!
//! A store that cannot be reached is `ServiceUnavailable` (503) and any other
//! store failure is `InternalFault` (500); neither is ever reported as a
//! denial.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::metrics;
use super::validator::{credential_from_headers, Principal, TokenState, TokenValidator};
use crate::errors::AppError;
use crate::models::token::mask;
use crate::store::StoreError;

/// The protected operation a route performs. Used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListTemplates,
    GetTemplate,
    CreateTemplate,
    UpdateTemplate,
    DeleteTemplate,
    ListEndpoints,
    CreateEndpoint,
    DeleteEndpoint,
    RevokeToken,
    CreateTenant,
    GetTenant,
    DeleteTenant,
    CreateUser,
    DeleteUser,
    SetUserEnabled,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListTemplates => "list_templates",
            Operation::GetTemplate => "get_template",
            Operation::CreateTemplate => "create_template",
            Operation::UpdateTemplate => "update_template",
            Operation::DeleteTemplate => "delete_template",
            Operation::ListEndpoints => "list_endpoints",
            Operation::CreateEndpoint => "create_endpoint",
            Operation::DeleteEndpoint => "delete_endpoint",
            Operation::RevokeToken => "revoke_token",
            Operation::CreateTenant => "create_tenant",
            Operation::GetTenant => "get_tenant",
            Operation::DeleteTenant => "delete_tenant",
            Operation::CreateUser => "create_user",
            Operation::DeleteUser => "delete_user",
            Operation::SetUserEnabled => "set_user_enabled",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allowed(Principal),
    Forbidden,
    Unauthorized,
    NotFound,
    InternalFault,
    ServiceUnavailable,
}

impl Outcome {
    /// The fixed TokenState → Outcome table. Independent of the operation.
    pub fn from_state(state: TokenState) -> Self {
        match state {
            TokenState::Valid(principal) => Outcome::Allowed(principal),
            TokenState::Disabled | TokenState::Expired => Outcome::Forbidden,
            TokenState::Missing => Outcome::Unauthorized,
            TokenState::Unrecognized => Outcome::NotFound,
        }
    }

    fn from_store_error(e: &StoreError) -> Self {
        match e {
            StoreError::Unavailable(_) => Outcome::ServiceUnavailable,
            _ => Outcome::InternalFault,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Allowed(_) => "allowed",
            Outcome::Forbidden => "forbidden",
            Outcome::Unauthorized => "unauthorized",
            Outcome::NotFound => "not_found",
            Outcome::InternalFault => "internal_fault",
            Outcome::ServiceUnavailable => "service_unavailable",
        }
    }

    /// The principal on `Allowed`, otherwise the error the caller sees.
    pub fn into_result(self) -> Result<Principal, AppError> {
        match self {
            Outcome::Allowed(principal) => Ok(principal),
            Outcome::Forbidden => Err(AppError::Forbidden(
                "token is expired or disabled".into(),
            )),
            Outcome::Unauthorized => Err(AppError::Unauthorized(
                "X-Auth-Token header is required".into(),
            )),
            Outcome::NotFound => Err(AppError::NotFound("token not found".into())),
            Outcome::InternalFault => Err(AppError::Internal(anyhow::anyhow!(
                "token validation failed"
            ))),
            Outcome::ServiceUnavailable => Err(AppError::Unavailable(
                "token store unreachable".into(),
            )),
        }
    }
}

/// Decide whether `credential` may perform `operation`.
pub async fn authorize(
    validator: &TokenValidator,
    credential: Option<&str>,
    operation: Operation,
) -> Outcome {
    let outcome = match validator.validate(credential).await {
        Ok(state) => Outcome::from_state(state),
        Err(e) => {
            tracing::error!(operation = %operation, "token validation failed: {}", e);
            Outcome::from_store_error(&e)
        }
    };

    let shown = credential.map(mask).unwrap_or_default();
    match &outcome {
        Outcome::Allowed(principal) => tracing::debug!(
            operation = %operation,
            user_id = %principal.user_id,
            "gate: allowed"
        ),
        Outcome::InternalFault | Outcome::ServiceUnavailable => {}
        denied => tracing::warn!(
            operation = %operation,
            token = %shown,
            outcome = denied.label(),
            "gate: denied"
        ),
    }

    metrics::record_decision(operation, &outcome);
    outcome
}

/// Middleware form of [`authorize`]. Mount per route with
/// `from_fn_with_state((validator, Operation::X), require_token)`.
/// On success the `Principal` is available to the handler as an extension.
pub async fn require_token(
    State((validator, operation)): State<(TokenValidator, Operation)>,
    mut req: Request,
    next: Next,
) -> Response {
    let credential = credential_from_headers(req.headers());
    let principal = match authorize(&validator, credential.as_deref(), operation)
        .await
        .into_result()
    {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(principal);
    let response = next.run(req).await;
    if response.status().is_server_error() {
        tracing::error!(
            operation = %operation,
            status = response.status().as_u16(),
            "resource operation failed"
        );
    }
    response
}
