//! In-memory backend.
//!
//! Not durable; state lives for the life of the process. Every map is a
//! `DashMap`, so reads run concurrently and each mutation is atomic for its
//! own entity:
//! - ids come from atomic counters, so concurrent creates never share an id
//! - deletes are a single `remove`/`remove_if`, so concurrent deletes of the
//!   same id see exactly one success
//! - endpoint insertion holds the owning tenant's entry, so a concurrent
//!   tenant deletion either sees the new endpoint in its cascade or the
//!   insertion fails with `NotFound`

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{
    DirectoryStore, EndpointStore, IdentityStore, StoreError, StoreResult, TemplateStore,
    TokenStore,
};
use crate::models::catalog::{Endpoint, EndpointTemplate, NewEndpoint, NewTemplate};
use crate::models::directory::{Tenant, User};
use crate::models::token::Token;

pub struct MemoryStore {
    tokens: DashMap<String, Token>,
    tenants: DashMap<String, Tenant>,
    users: DashMap<String, User>,
    templates: DashMap<i64, EndpointTemplate>,
    endpoints: DashMap<i64, Endpoint>,
    next_template_id: AtomicI64,
    next_endpoint_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
            tenants: DashMap::new(),
            users: DashMap::new(),
            templates: DashMap::new(),
            endpoints: DashMap::new(),
            next_template_id: AtomicI64::new(1),
            next_endpoint_id: AtomicI64::new(1),
        }
    }
}

/// Ids are handed out in increasing order, so sorting by id restores
/// insertion order.
fn sorted_by_id<T: Clone>(items: impl Iterator<Item = (i64, T)>) -> Vec<T> {
    let mut items: Vec<(i64, T)> = items.collect();
    items.sort_by_key(|(id, _)| *id);
    items.into_iter().map(|(_, item)| item).collect()
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_token(&self, id: &str) -> StoreResult<Option<Token>> {
        Ok(self.tokens.get(id).map(|t| t.value().clone()))
    }

    async fn insert_token(&self, token: Token) -> StoreResult<Token> {
        match self.tokens.entry(token.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("token {}", token.id))),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(token)
            }
        }
    }

    async fn revoke_token(&self, id: &str) -> StoreResult<bool> {
        match self.tokens.get_mut(id) {
            Some(mut token) => {
                token.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_token(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tokens.remove(id).is_some())
    }

    async fn purge_tokens_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, token| token.expires_at >= cutoff);
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn get_tenant(&self, id: &str) -> StoreResult<Option<Tenant>> {
        Ok(self.tenants.get(id).map(|t| t.value().clone()))
    }

    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        match self.tenants.entry(tenant.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("tenant {}", tenant.id))),
            Entry::Vacant(slot) => {
                slot.insert(tenant.clone());
                Ok(tenant)
            }
        }
    }

    async fn delete_tenant(&self, id: &str) -> StoreResult<bool> {
        if self.tenants.remove(id).is_none() {
            return Ok(false);
        }
        self.endpoints.retain(|_, endpoint| endpoint.tenant_id != id);
        Ok(true)
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!("user {}", user.id))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        if self.users.remove(id).is_none() {
            return Ok(false);
        }
        self.tokens.retain(|_, token| token.user_id != id);
        Ok(true)
    }

    async fn set_user_enabled(&self, id: &str, enabled: bool) -> StoreResult<Option<User>> {
        Ok(self.users.get_mut(id).map(|mut user| {
            user.enabled = enabled;
            user.clone()
        }))
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list_templates(&self) -> StoreResult<Vec<EndpointTemplate>> {
        Ok(sorted_by_id(
            self.templates.iter().map(|t| (*t.key(), t.value().clone())),
        ))
    }

    async fn get_template(&self, id: i64) -> StoreResult<Option<EndpointTemplate>> {
        Ok(self.templates.get(&id).map(|t| t.value().clone()))
    }

    async fn insert_template(&self, template: NewTemplate) -> StoreResult<EndpointTemplate> {
        let id = self.next_template_id.fetch_add(1, Ordering::SeqCst);
        let template = template.with_id(id);
        self.templates.insert(id, template.clone());
        Ok(template)
    }

    async fn update_template(
        &self,
        id: i64,
        template: NewTemplate,
    ) -> StoreResult<Option<EndpointTemplate>> {
        Ok(self.templates.get_mut(&id).map(|mut existing| {
            *existing = template.with_id(id);
            existing.clone()
        }))
    }

    async fn delete_template(&self, id: i64) -> StoreResult<bool> {
        Ok(self.templates.remove(&id).is_some())
    }
}

#[async_trait]
impl EndpointStore for MemoryStore {
    async fn list_endpoints(&self, tenant_id: &str) -> StoreResult<Vec<Endpoint>> {
        Ok(sorted_by_id(
            self.endpoints
                .iter()
                .filter(|e| e.tenant_id == tenant_id)
                .map(|e| (*e.key(), e.value().clone())),
        ))
    }

    async fn insert_endpoint(&self, endpoint: NewEndpoint) -> StoreResult<Endpoint> {
        // Held until the endpoint is visible; delete_tenant needs the shard
        // write lock to remove the tenant.
        let owner = self
            .tenants
            .get(&endpoint.tenant_id)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", endpoint.tenant_id)))?;

        let id = self.next_endpoint_id.fetch_add(1, Ordering::SeqCst);
        let endpoint = endpoint.with_id(id);
        self.endpoints.insert(id, endpoint.clone());
        drop(owner);
        Ok(endpoint)
    }

    async fn delete_endpoint(&self, tenant_id: &str, id: i64) -> StoreResult<bool> {
        Ok(self
            .endpoints
            .remove_if(&id, |_, endpoint| endpoint.tenant_id == tenant_id)
            .is_some())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
