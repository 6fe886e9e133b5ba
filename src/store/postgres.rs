//! Postgres backend (runtime-checked `sqlx` queries).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    DirectoryStore, EndpointStore, IdentityStore, StoreError, StoreResult, TemplateStore,
    TokenStore,
};
use crate::models::catalog::{Endpoint, EndpointTemplate, NewEndpoint, NewTemplate};
use crate::models::directory::{Tenant, User};
use crate::models::token::Token;

const TEMPLATE_COLUMNS: &str =
    "id, name, service_type, region, public_url, admin_url, internal_url, is_global";
const ENDPOINT_COLUMNS: &str =
    "id, tenant_id, template_id, name, service_type, region, public_url, admin_url, internal_url";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn get_token(&self, id: &str) -> StoreResult<Option<Token>> {
        let row = sqlx::query_as::<_, Token>(
            "SELECT id, user_id, tenant_id, issued_at, expires_at, revoked FROM tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_token(&self, token: Token) -> StoreResult<Token> {
        sqlx::query(
            r#"INSERT INTO tokens (id, user_id, tenant_id, issued_at, expires_at, revoked)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.tenant_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    async fn revoke_token(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE tokens SET revoked = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_token(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_tokens_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn get_tenant(&self, id: &str) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, Tenant>(
            "SELECT id, description, created_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        let row = sqlx::query_as::<_, Tenant>(
            r#"INSERT INTO tenants (id, description, created_at)
               VALUES ($1, $2, $3)
               RETURNING id, description, created_at"#,
        )
        .bind(&tenant.id)
        .bind(&tenant.description)
        .bind(tenant.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_tenant(&self, id: &str) -> StoreResult<bool> {
        // endpoints.tenant_id cascades
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, tenant_id, email, password_hash, enabled FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"INSERT INTO users (id, tenant_id, email, password_hash, enabled)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&user.id)
        .bind(&user.tenant_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.enabled)
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        // tokens.user_id cascades
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_enabled(&self, id: &str, enabled: bool) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"UPDATE users SET enabled = $2 WHERE id = $1
               RETURNING id, tenant_id, email, password_hash, enabled"#,
        )
        .bind(id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn list_templates(&self) -> StoreResult<Vec<EndpointTemplate>> {
        let rows = sqlx::query_as::<_, EndpointTemplate>(&format!(
            "SELECT {} FROM endpoint_templates ORDER BY id ASC",
            TEMPLATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_template(&self, id: i64) -> StoreResult<Option<EndpointTemplate>> {
        let row = sqlx::query_as::<_, EndpointTemplate>(&format!(
            "SELECT {} FROM endpoint_templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_template(&self, template: NewTemplate) -> StoreResult<EndpointTemplate> {
        let row = sqlx::query_as::<_, EndpointTemplate>(&format!(
            r#"INSERT INTO endpoint_templates
                   (name, service_type, region, public_url, admin_url, internal_url, is_global)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            TEMPLATE_COLUMNS
        ))
        .bind(&template.name)
        .bind(&template.service_type)
        .bind(&template.region)
        .bind(&template.public_url)
        .bind(&template.admin_url)
        .bind(&template.internal_url)
        .bind(template.is_global)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_template(
        &self,
        id: i64,
        template: NewTemplate,
    ) -> StoreResult<Option<EndpointTemplate>> {
        let row = sqlx::query_as::<_, EndpointTemplate>(&format!(
            r#"UPDATE endpoint_templates
               SET name = $2, service_type = $3, region = $4, public_url = $5,
                   admin_url = $6, internal_url = $7, is_global = $8
               WHERE id = $1
               RETURNING {}"#,
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .bind(&template.name)
        .bind(&template.service_type)
        .bind(&template.region)
        .bind(&template.public_url)
        .bind(&template.admin_url)
        .bind(&template.internal_url)
        .bind(template.is_global)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_template(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM endpoint_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EndpointStore for PgStore {
    async fn list_endpoints(&self, tenant_id: &str) -> StoreResult<Vec<Endpoint>> {
        let rows = sqlx::query_as::<_, Endpoint>(&format!(
            "SELECT {} FROM endpoints WHERE tenant_id = $1 ORDER BY id ASC",
            ENDPOINT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_endpoint(&self, endpoint: NewEndpoint) -> StoreResult<Endpoint> {
        // The EXISTS guard and the tenant foreign key make the insert fail
        // cleanly if the tenant is gone.
        let row = sqlx::query_as::<_, Endpoint>(&format!(
            r#"INSERT INTO endpoints
                   (tenant_id, template_id, name, service_type, region,
                    public_url, admin_url, internal_url)
               SELECT $1, $2, $3, $4, $5, $6, $7, $8
               WHERE EXISTS (SELECT 1 FROM tenants WHERE id = $1)
               RETURNING {}"#,
            ENDPOINT_COLUMNS
        ))
        .bind(&endpoint.tenant_id)
        .bind(endpoint.template_id)
        .bind(&endpoint.name)
        .bind(&endpoint.service_type)
        .bind(&endpoint.region)
        .bind(&endpoint.public_url)
        .bind(&endpoint.admin_url)
        .bind(&endpoint.internal_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                StoreError::NotFound(format!("tenant {}", endpoint.tenant_id))
            }
            other => other.into(),
        })?;

        row.ok_or_else(|| StoreError::NotFound(format!("tenant {}", endpoint.tenant_id)))
    }

    async fn delete_endpoint(&self, tenant_id: &str, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM endpoints WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
