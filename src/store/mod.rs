//! Owned stores behind explicit interfaces.
//!
//! Each trait exposes the capability set the core needs (lookup by id,
//! insert, delete by id, list). The gate, the template registry and the
//! endpoint manager only ever see `dyn IdentityStore`, so the in-memory and
//! Postgres backends are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::catalog::{Endpoint, EndpointTemplate, NewEndpoint, NewTemplate};
use crate::models::directory::{Tenant, User};
use crate::models::token::Token;

pub mod memory;
pub mod postgres;
pub mod seed;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backing dependency cannot be reached right now.
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Unexpected(other.into()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, id: &str) -> StoreResult<Option<Token>>;
    /// Fails with `Conflict` if the id is taken.
    async fn insert_token(&self, token: Token) -> StoreResult<Token>;
    /// Mark a token revoked. Returns false if it does not exist.
    async fn revoke_token(&self, id: &str) -> StoreResult<bool>;
    /// Destroy a token. Returns false if it does not exist.
    async fn delete_token(&self, id: &str) -> StoreResult<bool>;
    /// Destroy every token that expired before `cutoff`.
    async fn purge_tokens_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// The tenant/user collaborator. Only what endpoint ownership and
/// authentication need.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_tenant(&self, id: &str) -> StoreResult<Option<Tenant>>;
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant>;
    /// Deleting a tenant cascades to its endpoints.
    async fn delete_tenant(&self, id: &str) -> StoreResult<bool>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    /// Deleting a user cascades to its tokens.
    async fn delete_user(&self, id: &str) -> StoreResult<bool>;
    async fn set_user_enabled(&self, id: &str, enabled: bool) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Templates in insertion order.
    async fn list_templates(&self) -> StoreResult<Vec<EndpointTemplate>>;
    async fn get_template(&self, id: i64) -> StoreResult<Option<EndpointTemplate>>;
    /// Assigns a fresh id.
    async fn insert_template(&self, template: NewTemplate) -> StoreResult<EndpointTemplate>;
    async fn update_template(
        &self,
        id: i64,
        template: NewTemplate,
    ) -> StoreResult<Option<EndpointTemplate>>;
    async fn delete_template(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// Endpoints owned by `tenant_id`, in insertion order.
    async fn list_endpoints(&self, tenant_id: &str) -> StoreResult<Vec<Endpoint>>;
    /// Assigns a fresh id. Fails with `NotFound` if the owning tenant does
    /// not exist at the moment of insertion.
    async fn insert_endpoint(&self, endpoint: NewEndpoint) -> StoreResult<Endpoint>;
    /// Removes the endpoint only if it is owned by `tenant_id`.
    async fn delete_endpoint(&self, tenant_id: &str, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait IdentityStore: TokenStore + DirectoryStore + TemplateStore + EndpointStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
