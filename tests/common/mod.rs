#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use identity::api;
use identity::config::Config;
use identity::store::memory::MemoryStore;
use identity::store::seed::Seed;
use identity::AppState;

pub const ADMIN_TOKEN: &str = "887665443383838";
pub const EXPIRED_TOKEN: &str = "000999";
pub const DISABLED_TOKEN: &str = "999888777666";
pub const REVOKED_TOKEN: &str = "444333222111";
pub const UNKNOWN_TOKEN: &str = "invalid_token";

pub const TENANT: &str = "1234";
pub const OTHER_TENANT: &str = "5678";

const DIRECTORY: &str = r#"
tenants:
  - id: "1234"
    description: Primary tenant
  - id: "5678"
    description: Other tenant
users:
  - id: joeuser
    password: secrete
    tenant_id: "1234"
  - id: disabled
    password: secrete
    tenant_id: "1234"
    enabled: false
tokens:
  - id: "887665443383838"
    user_id: joeuser
    tenant_id: "1234"
    expires_at: "2099-02-05T00:00:00Z"
  - id: "000999"
    user_id: joeuser
    tenant_id: "1234"
    expires_at: "2010-02-05T00:00:00Z"
  - id: "999888777666"
    user_id: disabled
    tenant_id: "1234"
    expires_at: "2099-02-05T00:00:00Z"
  - id: "444333222111"
    user_id: joeuser
    expires_at: "2099-02-05T00:00:00Z"
    revoked: true
"#;

const TEMPLATE: &str = r#"
templates:
  - name: nova
    type: compute
    region: RegionOne
    publicURL: http://nova.example.com:8774/v1.1/%tenant_id%
    adminURL: http://nova.example.com:8774/v1.1/%tenant_id%
    internalURL: http://nova.internal:8774/v1.1/%tenant_id%
"#;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// Directory and tokens, empty catalog.
pub async fn app() -> TestApp {
    build(&[DIRECTORY]).await
}

/// Directory, tokens and endpoint template 1.
pub async fn app_with_template() -> TestApp {
    build(&[DIRECTORY, TEMPLATE]).await
}

async fn build(seeds: &[&str]) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    for seed in seeds {
        Seed::parse(seed)
            .unwrap()
            .apply(store.as_ref())
            .await
            .unwrap();
    }
    let state = Arc::new(AppState::new(store.clone(), Config::default()));
    TestApp {
        router: api::router(state),
        store,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub fn mime(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Xml => "application/xml",
        }
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

impl TestApp {
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        format: Format,
        body: Option<String>,
    ) -> Reply {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("accept", format.mime());
        if let Some(t) = token {
            builder = builder.header("x-auth-token", t);
        }
        let body = match body {
            Some(b) => {
                builder = builder.header("content-type", format.mime());
                Body::from(b)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>, format: Format) -> Reply {
        self.call(Method::GET, uri, token, format, None).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>, format: Format) -> Reply {
        self.call(Method::DELETE, uri, token, format, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, format: Format, body: &str) -> Reply {
        self.call(Method::POST, uri, token, format, Some(body.to_string()))
            .await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, format: Format, body: &str) -> Reply {
        self.call(Method::PUT, uri, token, format, Some(body.to_string()))
            .await
    }
}

/// Body referencing endpoint template `id` in the given format.
pub fn endpoint_body(format: Format, id: &str) -> String {
    match format {
        Format::Json => format!(r#"{{"endpointTemplate": {{"id": {}}}}}"#, id),
        Format::Xml => format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><endpointTemplate xmlns="http://docs.openstack.org/identity/api/v2.0" id="{}"/>"#,
            id
        ),
    }
}

/// Every denied credential and the status the gate answers with.
pub const DENIALS: &[(Option<&str>, StatusCode)] = &[
    (None, StatusCode::UNAUTHORIZED),
    (Some(""), StatusCode::UNAUTHORIZED),
    (Some(EXPIRED_TOKEN), StatusCode::FORBIDDEN),
    (Some(DISABLED_TOKEN), StatusCode::FORBIDDEN),
    (Some(REVOKED_TOKEN), StatusCode::FORBIDDEN),
    (Some(UNKNOWN_TOKEN), StatusCode::NOT_FOUND),
];

pub const FORMATS: [Format; 2] = [Format::Json, Format::Xml];
