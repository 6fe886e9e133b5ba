//! Global catalog of endpoint templates.

use std::sync::Arc;

use url::Url;

use super::parse_id;
use crate::errors::AppError;
use crate::models::catalog::{EndpointTemplate, NewTemplate, TemplateSpec, TENANT_PLACEHOLDER};
use crate::store::{IdentityStore, TemplateStore};

#[derive(Clone)]
pub struct TemplateRegistry {
    store: Arc<dyn IdentityStore>,
}

impl TemplateRegistry {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Insertion order. An empty catalog is an empty list.
    pub async fn list_templates(&self) -> Result<Vec<EndpointTemplate>, AppError> {
        Ok(self.store.list_templates().await?)
    }

    pub async fn get_template(&self, id: &str) -> Result<EndpointTemplate, AppError> {
        let not_found = || AppError::NotFound(format!("endpoint template {} not found", id));
        let id = parse_id(id).ok_or_else(not_found)?;
        self.store.get_template(id).await?.ok_or_else(not_found)
    }

    pub async fn create_template(&self, spec: TemplateSpec) -> Result<EndpointTemplate, AppError> {
        let template = validate_spec(spec)?;
        let created = self.store.insert_template(template).await?;
        tracing::info!(template_id = created.id, name = %created.name, "endpoint template created");
        Ok(created)
    }

    /// Replace every field of an existing template. Endpoints already
    /// materialized from it keep their snapshot.
    pub async fn update_template(
        &self,
        id: &str,
        spec: TemplateSpec,
    ) -> Result<EndpointTemplate, AppError> {
        let not_found = || AppError::NotFound(format!("endpoint template {} not found", id));
        let id = parse_id(id).ok_or_else(not_found)?;
        let template = validate_spec(spec)?;
        let updated = self
            .store
            .update_template(id, template)
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(template_id = updated.id, "endpoint template updated");
        Ok(updated)
    }

    /// A second delete of the same id is `NotFound`.
    pub async fn delete_template(&self, id: &str) -> Result<(), AppError> {
        let not_found = || AppError::NotFound(format!("endpoint template {} not found", id));
        let parsed = parse_id(id).ok_or_else(not_found)?;
        if !self.store.delete_template(parsed).await? {
            return Err(not_found());
        }
        tracing::info!(template_id = parsed, "endpoint template deleted");
        Ok(())
    }
}

/// Check submitted template fields and turn them into an insertable template.
pub fn validate_spec(spec: TemplateSpec) -> Result<NewTemplate, AppError> {
    let name = required("name", spec.name)?;
    let service_type = required("type", spec.service_type)?;
    let public_url = required_url("publicURL", spec.public_url)?;
    let admin_url = required_url("adminURL", spec.admin_url)?;
    let internal_url = required_url("internalURL", spec.internal_url)?;
    let region = spec
        .region
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    Ok(NewTemplate {
        name,
        service_type,
        region,
        public_url,
        admin_url,
        internal_url,
        is_global: spec.global,
    })
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

fn required_url(field: &str, value: Option<String>) -> Result<String, AppError> {
    let pattern = required(field, value)?;
    // The placeholder is not a legal host or path segment on its own.
    let candidate = pattern.replace(TENANT_PLACEHOLDER, "tenant");
    let parsed = Url::parse(&candidate)
        .map_err(|e| AppError::BadRequest(format!("{} is not a valid URL: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(pattern),
        other => Err(AppError::BadRequest(format!(
            "{} must use http or https, not {}",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn spec(name: &str) -> TemplateSpec {
        TemplateSpec {
            name: Some(name.into()),
            service_type: Some("compute".into()),
            region: Some("RegionOne".into()),
            public_url: Some("http://nova.example.com:8774/v1.1/%tenant_id%".into()),
            admin_url: Some("http://nova.example.com:8774/v1.1/%tenant_id%".into()),
            internal_url: Some("http://nova.internal:8774/v1.1/%tenant_id%".into()),
            global: false,
        }
    }

    fn registry() -> TemplateRegistry {
        TemplateRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_validate_requires_every_url() {
        for strip in ["publicURL", "adminURL", "internalURL"] {
            let mut s = spec("nova");
            match strip {
                "publicURL" => s.public_url = None,
                "adminURL" => s.admin_url = Some("   ".into()),
                _ => s.internal_url = None,
            }
            match validate_spec(s) {
                Err(AppError::BadRequest(msg)) => assert!(msg.contains(strip), "{}", msg),
                other => panic!("expected bad request for {}, got {:?}", strip, other),
            }
        }
    }

    #[test]
    fn test_validate_rejects_non_http_urls() {
        let mut s = spec("nova");
        s.public_url = Some("ftp://nova.example.com/%tenant_id%".into());
        assert!(matches!(validate_spec(s), Err(AppError::BadRequest(_))));

        let mut s = spec("nova");
        s.admin_url = Some("not a url".into());
        assert!(matches!(validate_spec(s), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_keeps_placeholder_and_drops_blank_region() {
        let mut s = spec("nova");
        s.region = Some("  ".into());
        let template = tokio_test::assert_ok!(validate_spec(s));
        assert!(template.public_url.contains(TENANT_PLACEHOLDER));
        assert_eq!(template.region, None);
    }

    #[tokio::test]
    async fn test_empty_catalog_lists_empty() {
        assert!(registry().list_templates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids_in_order() {
        let registry = registry();
        let first = registry.create_template(spec("nova")).await.unwrap();
        let second = registry.create_template(spec("glance")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let names: Vec<String> = registry
            .list_templates()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["nova", "glance"]);
    }

    #[tokio::test]
    async fn test_get_unknown_or_malformed_id_is_not_found() {
        let registry = registry();
        registry.create_template(spec("nova")).await.unwrap();
        assert!(registry.get_template("1").await.is_ok());
        assert!(matches!(registry.get_template("99").await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.get_template("abc").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found() {
        let registry = registry();
        let created = registry.create_template(spec("nova")).await.unwrap();
        let id = created.id.to_string();
        registry.delete_template(&id).await.unwrap();
        assert!(matches!(registry.delete_template(&id).await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.get_template(&id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let registry = registry();
        let created = registry.create_template(spec("nova")).await.unwrap();
        let mut changed = spec("nova");
        changed.public_url = Some("https://compute.example.com/%tenant_id%".into());
        let updated = registry
            .update_template(&created.id.to_string(), changed)
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.public_url, "https://compute.example.com/%tenant_id%");

        assert!(matches!(
            registry.update_template("7", spec("x")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
