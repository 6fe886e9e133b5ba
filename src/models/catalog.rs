use serde::{Deserialize, Serialize};

/// Placeholder in template URL patterns replaced by the owning tenant id.
pub const TENANT_PLACEHOLDER: &str = "%tenant_id%";

/// A service catalog entry, independent of any tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EndpointTemplate {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
    #[serde(rename = "adminURL")]
    pub admin_url: String,
    #[serde(rename = "internalURL")]
    pub internal_url: String,
    #[serde(rename = "global")]
    pub is_global: bool,
}

/// Validated template fields, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplate {
    pub name: String,
    pub service_type: String,
    pub region: Option<String>,
    pub public_url: String,
    pub admin_url: String,
    pub internal_url: String,
    pub is_global: bool,
}

impl NewTemplate {
    pub fn with_id(self, id: i64) -> EndpointTemplate {
        EndpointTemplate {
            id,
            name: self.name,
            service_type: self.service_type,
            region: self.region,
            public_url: self.public_url,
            admin_url: self.admin_url,
            internal_url: self.internal_url,
            is_global: self.is_global,
        }
    }
}

/// Template fields as submitted by a client or a seed file. Every field is
/// optional here; `catalog::registry` decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: Option<String>,
    #[serde(rename = "adminURL")]
    pub admin_url: Option<String>,
    #[serde(rename = "internalURL")]
    pub internal_url: Option<String>,
    #[serde(default)]
    pub global: bool,
}

/// A tenant-owned instantiation of a template. URLs are a snapshot taken
/// at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Endpoint {
    pub id: i64,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "endpointTemplateId")]
    pub template_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
    #[serde(rename = "adminURL")]
    pub admin_url: String,
    #[serde(rename = "internalURL")]
    pub internal_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEndpoint {
    pub tenant_id: String,
    pub template_id: i64,
    pub name: String,
    pub service_type: String,
    pub region: Option<String>,
    pub public_url: String,
    pub admin_url: String,
    pub internal_url: String,
}

impl NewEndpoint {
    /// Materialize `template` for `tenant_id`, substituting the tenant
    /// placeholder in every URL pattern.
    pub fn materialize(template: &EndpointTemplate, tenant_id: &str) -> Self {
        let fill = |pattern: &str| pattern.replace(TENANT_PLACEHOLDER, tenant_id);
        Self {
            tenant_id: tenant_id.to_string(),
            template_id: template.id,
            name: template.name.clone(),
            service_type: template.service_type.clone(),
            region: template.region.clone(),
            public_url: fill(&template.public_url),
            admin_url: fill(&template.admin_url),
            internal_url: fill(&template.internal_url),
        }
    }

    pub fn with_id(self, id: i64) -> Endpoint {
        Endpoint {
            id,
            tenant_id: self.tenant_id,
            template_id: self.template_id,
            name: self.name,
            service_type: self.service_type,
            region: self.region,
            public_url: self.public_url,
            admin_url: self.admin_url,
            internal_url: self.internal_url,
        }
    }
}
