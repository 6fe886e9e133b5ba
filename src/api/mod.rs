use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    handler::Handler,
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::gate::{self, Operation};
use crate::middleware::{metrics, negotiate};
use crate::AppState;

pub mod handlers;
pub mod identity;
pub mod wire;

/// Request bodies are small documents; anything larger is refused.
const MAX_BODY_BYTES: usize = 64 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the full service router: the identity API under `/v2.0` plus the
/// ungated operational routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/v2.0", api_router(&state))
        .route("/healthz", get(liveness_check))
        .route("/readyz", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .fallback(fallback_404)
        .layer(middleware::from_fn(negotiate::render_faults))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

/// The identity API. Every route except `POST /tokens` passes through the
/// authorization gate, each under its own operation label.
fn api_router(state: &AppState) -> Router<Arc<AppState>> {
    let validator = state.validator.clone();
    let guard = move |operation: Operation| {
        middleware::from_fn_with_state((validator.clone(), operation), gate::require_token)
    };

    Router::new()
        .route("/tokens", post(identity::authenticate))
        .route(
            "/tokens/:id",
            delete(identity::revoke_token.layer(guard(Operation::RevokeToken))),
        )
        .route(
            "/endpointTemplates",
            get(handlers::list_templates.layer(guard(Operation::ListTemplates)))
                .post(handlers::create_template.layer(guard(Operation::CreateTemplate))),
        )
        .route(
            "/endpointTemplates/:id",
            get(handlers::get_template.layer(guard(Operation::GetTemplate)))
                .put(handlers::update_template.layer(guard(Operation::UpdateTemplate)))
                .delete(handlers::delete_template.layer(guard(Operation::DeleteTemplate))),
        )
        .route(
            "/tenants",
            post(identity::create_tenant.layer(guard(Operation::CreateTenant))),
        )
        .route(
            "/tenants/:tenant",
            get(identity::get_tenant.layer(guard(Operation::GetTenant)))
                .delete(identity::delete_tenant.layer(guard(Operation::DeleteTenant))),
        )
        .route(
            "/tenants/:tenant/endpoints",
            get(handlers::list_endpoints.layer(guard(Operation::ListEndpoints)))
                .post(handlers::create_endpoint.layer(guard(Operation::CreateEndpoint))),
        )
        .route(
            "/tenants/:tenant/endpoints/:id",
            delete(handlers::delete_endpoint.layer(guard(Operation::DeleteEndpoint))),
        )
        .route(
            "/users",
            post(identity::create_user.layer(guard(Operation::CreateUser))),
        )
        .route(
            "/users/:id",
            delete(identity::delete_user.layer(guard(Operation::DeleteUser))),
        )
        .route(
            "/users/:id/enabled",
            put(identity::set_user_enabled.layer(guard(Operation::SetUserEnabled))),
        )
}

async fn fallback_404() -> AppError {
    AppError::NotFound("no such resource".into())
}

async fn liveness_check() -> &'static str {
    "ok"
}

async fn readiness_check(State(state): State<Arc<AppState>>) -> Response {
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::warn!(backend = state.store.backend_name(), "readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        metrics::encode_metrics(),
    )
}

/// Middleware: injects a unique X-Request-Id into every response.
/// This allows clients to correlate errors with service logs.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: injects security headers into every response.
async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    // Responses carry credentials and tenant data.
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

    resp
}
