//! Tenant-scoped endpoints materialized from templates.

use std::sync::Arc;

use super::parse_id;
use crate::errors::AppError;
use crate::models::catalog::{Endpoint, NewEndpoint};
use crate::store::{DirectoryStore, EndpointStore, IdentityStore, StoreError, TemplateStore};

#[derive(Clone)]
pub struct EndpointManager {
    store: Arc<dyn IdentityStore>,
}

impl EndpointManager {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Endpoints owned by `tenant_id`, in insertion order.
    pub async fn list_endpoints(&self, tenant_id: &str) -> Result<Vec<Endpoint>, AppError> {
        if self.store.get_tenant(tenant_id).await?.is_none() {
            return Err(AppError::NotFound(format!("tenant {} not found", tenant_id)));
        }
        Ok(self.store.list_endpoints(tenant_id).await?)
    }

    /// Instantiate template `template_id` for `tenant_id`.
    ///
    /// The template is resolved first (`NotFound`), then the tenant
    /// (`BadRequest`). A tenant deleted between the check and the insert is
    /// reported the same way as one that never existed.
    pub async fn create_endpoint(
        &self,
        tenant_id: &str,
        template_id: Option<&str>,
    ) -> Result<Endpoint, AppError> {
        let raw = template_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("endpointTemplate id is required".into()))?;

        let template_not_found =
            || AppError::NotFound(format!("endpoint template {} not found", raw));
        let id = parse_id(raw).ok_or_else(template_not_found)?;
        let template = self
            .store
            .get_template(id)
            .await?
            .ok_or_else(template_not_found)?;

        let unknown_tenant = || AppError::BadRequest(format!("tenant {} does not exist", tenant_id));
        if self.store.get_tenant(tenant_id).await?.is_none() {
            return Err(unknown_tenant());
        }

        let endpoint = match self
            .store
            .insert_endpoint(NewEndpoint::materialize(&template, tenant_id))
            .await
        {
            Ok(endpoint) => endpoint,
            Err(StoreError::NotFound(_)) => return Err(unknown_tenant()),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            tenant_id = %tenant_id,
            endpoint_id = endpoint.id,
            template_id = template.id,
            "endpoint created"
        );
        Ok(endpoint)
    }

    /// An endpoint owned by another tenant is `NotFound` here.
    pub async fn delete_endpoint(&self, tenant_id: &str, endpoint_id: &str) -> Result<(), AppError> {
        let not_found = || {
            AppError::NotFound(format!(
                "endpoint {} not found for tenant {}",
                endpoint_id, tenant_id
            ))
        };
        let id = parse_id(endpoint_id).ok_or_else(not_found)?;
        if !self.store.delete_endpoint(tenant_id, id).await? {
            return Err(not_found());
        }
        tracing::info!(tenant_id = %tenant_id, endpoint_id = id, "endpoint deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::NewTemplate;
    use crate::models::directory::Tenant;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    async fn setup() -> (Arc<MemoryStore>, EndpointManager) {
        let store = Arc::new(MemoryStore::new());
        for id in ["1234", "5678"] {
            store
                .insert_tenant(Tenant {
                    id: id.into(),
                    description: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        store
            .insert_template(NewTemplate {
                name: "nova".into(),
                service_type: "compute".into(),
                region: None,
                public_url: "http://nova.example.com/v1.1/%tenant_id%".into(),
                admin_url: "http://nova.example.com/v1.1/%tenant_id%".into(),
                internal_url: "http://nova.internal/v1.1/%tenant_id%".into(),
                is_global: false,
            })
            .await
            .unwrap();
        let manager = EndpointManager::new(store.clone());
        (store, manager)
    }

    #[tokio::test]
    async fn test_tenant_without_endpoints_lists_empty() {
        let (_, manager) = setup().await;
        assert!(manager.list_endpoints("1234").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_for_unknown_tenant_is_not_found() {
        let (_, manager) = setup().await;
        assert!(matches!(
            manager.list_endpoints("nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_materializes_urls() {
        let (_, manager) = setup().await;
        let endpoint = manager.create_endpoint("1234", Some("1")).await.unwrap();
        assert_eq!(endpoint.id, 1);
        assert_eq!(endpoint.public_url, "http://nova.example.com/v1.1/1234");
        assert_eq!(manager.list_endpoints("1234").await.unwrap(), vec![endpoint]);
        assert!(manager.list_endpoints("5678").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_error_precedence() {
        let (_, manager) = setup().await;
        assert!(matches!(
            manager.create_endpoint("1234", None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            manager.create_endpoint("1234", Some("99")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.create_endpoint("1234", Some("abc")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.create_endpoint("ghost", Some("1")).await,
            Err(AppError::BadRequest(_))
        ));
        // Template is checked before the tenant.
        assert!(matches!(
            manager.create_endpoint("ghost", Some("99")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_twice_and_across_tenants() {
        let (_, manager) = setup().await;
        let endpoint = manager.create_endpoint("1234", Some("1")).await.unwrap();
        let id = endpoint.id.to_string();

        assert!(matches!(
            manager.delete_endpoint("5678", &id).await,
            Err(AppError::NotFound(_))
        ));
        manager.delete_endpoint("1234", &id).await.unwrap();
        assert!(matches!(
            manager.delete_endpoint("1234", &id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_endpoint_survives_template_deletion() {
        let (store, manager) = setup().await;
        let endpoint = manager.create_endpoint("1234", Some("1")).await.unwrap();
        store.delete_template(1).await.unwrap();
        assert_eq!(manager.list_endpoints("1234").await.unwrap(), vec![endpoint]);
    }
}
