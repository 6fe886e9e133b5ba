use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(what) => AppError::Conflict(what),
            StoreError::Unavailable(reason) => AppError::Unavailable(reason),
            StoreError::Unexpected(e) => AppError::Internal(e),
        }
    }
}

/// The fault carried by an error response. Attached to the response
/// extensions so `middleware::negotiate` can re-render it as XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub root: &'static str,
    pub code: u16,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn fault(&self) -> Fault {
        let (root, message) = match self {
            AppError::Unauthorized(msg) => ("unauthorized", msg.clone()),
            AppError::Forbidden(msg) => ("forbidden", msg.clone()),
            AppError::NotFound(msg) => ("itemNotFound", msg.clone()),
            AppError::BadRequest(msg) => ("badRequest", msg.clone()),
            AppError::Conflict(msg) => ("conflict", msg.clone()),
            AppError::Unavailable(_) => (
                "serviceUnavailable",
                "service unavailable".to_string(),
            ),
            AppError::Internal(_) => ("identityFault", "internal server error".to_string()),
        };
        Fault {
            root,
            code: self.status().as_u16(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(e) => tracing::error!("Internal error: {:#}", e),
            AppError::Unavailable(reason) => tracing::error!("Backing store unavailable: {}", reason),
            _ => {}
        }

        let fault = self.fault();
        let mut body = serde_json::Map::new();
        body.insert(
            fault.root.to_string(),
            json!({
                "message": fault.message,
                "code": fault.code,
            }),
        );

        let mut response = (self.status(), Json(body)).into_response();
        response.extensions_mut().insert(fault);
        response
    }
}
