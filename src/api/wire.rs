//! Request and response documents, in both JSON and XML.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::negotiate::{
    to_xml, xml_response, FromXml, Representation, XmlDocument, XML_NAMESPACE,
};
use crate::models::catalog::{Endpoint, EndpointTemplate, TemplateSpec};
use crate::models::directory::{Tenant, User};

type XmlWriter = Writer<Vec<u8>>;

/// A success document rendered in the negotiated representation.
pub struct Reply<D> {
    status: StatusCode,
    representation: Representation,
    doc: D,
}

impl<D> Reply<D> {
    pub fn ok(representation: Representation, doc: D) -> Self {
        Self::with_status(StatusCode::OK, representation, doc)
    }

    pub fn created(representation: Representation, doc: D) -> Self {
        Self::with_status(StatusCode::CREATED, representation, doc)
    }

    pub fn with_status(status: StatusCode, representation: Representation, doc: D) -> Self {
        Self {
            status,
            representation,
            doc,
        }
    }
}

impl<D: Serialize + XmlDocument> IntoResponse for Reply<D> {
    fn into_response(self) -> Response {
        match self.representation {
            Representation::Json => (self.status, Json(self.doc)).into_response(),
            Representation::Xml => match to_xml(&self.doc) {
                Ok(body) => xml_response(self.status, body),
                Err(e) => AppError::Internal(anyhow::anyhow!("xml rendering failed: {}", e))
                    .into_response(),
            },
        }
    }
}

// ── XML helpers ──────────────────────────────────────────────

fn empty_element(
    w: &mut XmlWriter,
    name: &str,
    namespaced: bool,
    attrs: &[(&str, String)],
) -> quick_xml::Result<()> {
    let mut element = w.create_element(name);
    if namespaced {
        element = element.with_attribute(("xmlns", XML_NAMESPACE));
    }
    element
        .with_attributes(attrs.iter().map(|(k, v)| (*k, v.as_str())))
        .write_empty()?;
    Ok(())
}

fn list_element<T>(
    w: &mut XmlWriter,
    name: &str,
    items: &[T],
    item: impl Fn(&mut XmlWriter, &T) -> quick_xml::Result<()>,
) -> quick_xml::Result<()> {
    w.create_element(name)
        .with_attribute(("xmlns", XML_NAMESPACE))
        .write_inner_content(|w| {
            for entry in items {
                item(w, entry)?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

fn push_opt(attrs: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        attrs.push((key, v.clone()));
    }
}

fn template_attrs(t: &EndpointTemplate) -> Vec<(&'static str, String)> {
    let mut attrs = vec![
        ("id", t.id.to_string()),
        ("name", t.name.clone()),
        ("type", t.service_type.clone()),
    ];
    push_opt(&mut attrs, "region", &t.region);
    attrs.extend([
        ("publicURL", t.public_url.clone()),
        ("adminURL", t.admin_url.clone()),
        ("internalURL", t.internal_url.clone()),
        ("global", t.is_global.to_string()),
    ]);
    attrs
}

fn endpoint_attrs(e: &Endpoint) -> Vec<(&'static str, String)> {
    let mut attrs = vec![
        ("id", e.id.to_string()),
        ("tenantId", e.tenant_id.clone()),
        ("endpointTemplateId", e.template_id.to_string()),
        ("name", e.name.clone()),
        ("type", e.service_type.clone()),
    ];
    push_opt(&mut attrs, "region", &e.region);
    attrs.extend([
        ("publicURL", e.public_url.clone()),
        ("adminURL", e.admin_url.clone()),
        ("internalURL", e.internal_url.clone()),
    ]);
    attrs
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Catalog documents ────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TemplatesDoc {
    #[serde(rename = "endpointTemplates")]
    pub endpoint_templates: Vec<EndpointTemplate>,
}

impl XmlDocument for TemplatesDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        list_element(w, "endpointTemplates", &self.endpoint_templates, |w, t| {
            empty_element(w, "endpointTemplate", false, &template_attrs(t))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateDoc {
    #[serde(rename = "endpointTemplate")]
    pub endpoint_template: EndpointTemplate,
}

impl XmlDocument for TemplateDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        empty_element(w, "endpointTemplate", true, &template_attrs(&self.endpoint_template))
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointsDoc {
    pub endpoints: Vec<Endpoint>,
}

impl XmlDocument for EndpointsDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        list_element(w, "endpoints", &self.endpoints, |w, e| {
            empty_element(w, "endpoint", false, &endpoint_attrs(e))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointDoc {
    pub endpoint: Endpoint,
}

impl XmlDocument for EndpointDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        empty_element(w, "endpoint", true, &endpoint_attrs(&self.endpoint))
    }
}

// ── Directory documents ──────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TenantDoc {
    pub tenant: Tenant,
}

impl XmlDocument for TenantDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        let mut attrs = vec![("id", self.tenant.id.clone())];
        push_opt(&mut attrs, "description", &self.tenant.description);
        attrs.push(("created_at", timestamp(&self.tenant.created_at)));
        empty_element(w, "tenant", true, &attrs)
    }
}

#[derive(Debug, Serialize)]
pub struct UserDoc {
    pub user: User,
}

impl XmlDocument for UserDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        let mut attrs = vec![("id", self.user.id.clone())];
        push_opt(&mut attrs, "tenantId", &self.user.tenant_id);
        push_opt(&mut attrs, "email", &self.user.email);
        attrs.push(("enabled", self.user.enabled.to_string()));
        empty_element(w, "user", true, &attrs)
    }
}

#[derive(Debug, Serialize)]
pub struct AuthDoc {
    pub auth: AuthBody,
}

#[derive(Debug, Serialize)]
pub struct AuthBody {
    pub token: IssuedToken,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub id: String,
    pub expires: String,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl AuthDoc {
    pub fn new(id: String, expires_at: DateTime<Utc>, tenant_id: Option<String>) -> Self {
        Self {
            auth: AuthBody {
                token: IssuedToken {
                    id,
                    expires: timestamp(&expires_at),
                    tenant_id,
                },
            },
        }
    }
}

impl XmlDocument for AuthDoc {
    fn write_xml(&self, w: &mut XmlWriter) -> quick_xml::Result<()> {
        let token = &self.auth.token;
        let mut attrs = vec![("id", token.id.clone()), ("expires", token.expires.clone())];
        push_opt(&mut attrs, "tenantId", &token.tenant_id);
        w.create_element("auth")
            .with_attribute(("xmlns", XML_NAMESPACE))
            .write_inner_content(|w| empty_element(w, "token", false, &attrs))?;
        Ok(())
    }
}

// ── Request documents ────────────────────────────────────────

fn expect_root(root: &str, expected: &str) -> Result<(), AppError> {
    if root == expected {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "expected <{}> element, found <{}>",
            expected, root
        )))
    }
}

fn attr(attributes: &HashMap<String, String>, key: &str) -> Option<String> {
    attributes.get(key).cloned()
}

fn bool_attr(attributes: &HashMap<String, String>, key: &str) -> Result<Option<bool>, AppError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<bool>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be true or false", key))),
    }
}

/// `{"endpointTemplate": {"id": 1}}` or `<endpointTemplate id="1"/>`.
#[derive(Debug, Deserialize)]
pub struct EndpointCreateRequest {
    #[serde(rename = "endpointTemplate")]
    pub endpoint_template: TemplateRef,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateRef {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl TemplateRef {
    /// Numbers and strings are both accepted as ids.
    pub fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl FromXml for EndpointCreateRequest {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError> {
        expect_root(root, "endpointTemplate")?;
        Ok(Self {
            endpoint_template: TemplateRef {
                id: attr(attributes, "id").map(serde_json::Value::String),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    #[serde(rename = "endpointTemplate")]
    pub endpoint_template: TemplateSpec,
}

impl FromXml for TemplateRequest {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError> {
        expect_root(root, "endpointTemplate")?;
        Ok(Self {
            endpoint_template: TemplateSpec {
                name: attr(attributes, "name"),
                service_type: attr(attributes, "type"),
                region: attr(attributes, "region"),
                public_url: attr(attributes, "publicURL"),
                admin_url: attr(attributes, "adminURL"),
                internal_url: attr(attributes, "internalURL"),
                global: bool_attr(attributes, "global")?.unwrap_or(false),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TenantRequest {
    pub tenant: TenantSpec,
}

#[derive(Debug, Deserialize)]
pub struct TenantSpec {
    #[serde(default)]
    pub id: String,
    pub description: Option<String>,
}

impl FromXml for TenantRequest {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError> {
        expect_root(root, "tenant")?;
        Ok(Self {
            tenant: TenantSpec {
                id: attr(attributes, "id").unwrap_or_default(),
                description: attr(attributes, "description"),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user: UserSpec,
}

#[derive(Debug, Deserialize)]
pub struct UserSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
    pub email: Option<String>,
    pub enabled: Option<bool>,
}

impl FromXml for UserRequest {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError> {
        expect_root(root, "user")?;
        Ok(Self {
            user: UserSpec {
                id: attr(attributes, "id").unwrap_or_default(),
                password: attr(attributes, "password").unwrap_or_default(),
                tenant_id: attr(attributes, "tenantId"),
                email: attr(attributes, "email"),
                enabled: bool_attr(attributes, "enabled")?,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserEnabledRequest {
    pub user: UserEnabled,
}

#[derive(Debug, Deserialize)]
pub struct UserEnabled {
    pub enabled: bool,
}

impl FromXml for UserEnabledRequest {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError> {
        expect_root(root, "user")?;
        let enabled = bool_attr(attributes, "enabled")?
            .ok_or_else(|| AppError::BadRequest("enabled is required".into()))?;
        Ok(Self {
            user: UserEnabled { enabled },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "passwordCredentials")]
    pub password_credentials: PasswordCredentials,
}

#[derive(Debug, Deserialize)]
pub struct PasswordCredentials {
    pub username: String,
    pub password: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
}

impl FromXml for AuthRequest {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError> {
        expect_root(root, "passwordCredentials")?;
        let required = |key: &str| {
            attr(attributes, key).ok_or_else(|| AppError::BadRequest(format!("{} is required", key)))
        };
        Ok(Self {
            password_credentials: PasswordCredentials {
                username: required("username")?,
                password: required("password")?,
                tenant_id: attr(attributes, "tenantId"),
            },
        })
    }
}
