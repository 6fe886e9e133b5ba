//! YAML seed files: bootstrap tenants, users, tokens and templates.
//!
//! ```yaml
//! tenants:
//!   - id: "1234"
//!     description: Sample tenant
//! users:
//!   - id: joeuser
//!     password: secrete
//!     tenant_id: "1234"
//! tokens:
//!   - id: "887665443383838"
//!     user_id: joeuser
//!     tenant_id: "1234"
//!     expires_at: "2099-02-05T00:00:00Z"
//!   - id: "000999"
//!     user_id: joeuser
//!     expires_in_secs: -3600
//! templates:
//!   - name: nova
//!     type: compute
//!     publicURL: http://nova.example.com/v1.1/%tenant_id%
//!     adminURL: http://nova.example.com/v1.1/%tenant_id%
//!     internalURL: http://nova.internal/v1.1/%tenant_id%
//! ```
//!
//! A token's expiry is either absolute (`expires_at`) or relative to the
//! moment the seed is applied (`expires_in_secs`, negative for a token that
//! is already expired).
//!
//! Tenants, users and tokens whose id already exists are skipped, so a seed
//! can be re-applied. Templates have no caller-chosen id and are only
//! inserted when the catalog is empty.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{DirectoryStore, IdentityStore, StoreError, TemplateStore, TokenStore};
use crate::catalog::registry::validate_spec;
use crate::models::catalog::TemplateSpec;
use crate::models::directory::{hash_password, Tenant, User};
use crate::models::token::Token;

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub tenants: Vec<SeedTenant>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub tokens: Vec<SeedToken>,
    #[serde(default)]
    pub templates: Vec<TemplateSpec>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTenant {
    pub id: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub password: String,
    pub tenant_id: Option<String>,
    pub email: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedToken {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in_secs: Option<i64>,
    #[serde(default)]
    pub revoked: bool,
}

impl SeedToken {
    fn expiry(&self, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
        match (self.expires_at, self.expires_in_secs) {
            (Some(at), None) => Ok(at),
            (None, Some(secs)) => chrono::Duration::try_seconds(secs)
                .and_then(|offset| now.checked_add_signed(offset))
                .with_context(|| format!("token {}: expires_in_secs out of range", self.id)),
            (Some(_), Some(_)) => anyhow::bail!(
                "token {}: set either expires_at or expires_in_secs, not both",
                self.id
            ),
            (None, None) => anyhow::bail!("token {}: missing expires_at", self.id),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// What `apply` actually inserted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub tenants: usize,
    pub users: usize,
    pub tokens: usize,
    pub templates: usize,
}

impl Seed {
    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid seed file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        Self::parse(&raw)
    }

    pub async fn apply(self, store: &dyn IdentityStore) -> anyhow::Result<SeedReport> {
        let mut report = SeedReport::default();
        let now = Utc::now();

        for tenant in self.tenants {
            let inserted = store
                .insert_tenant(Tenant {
                    id: tenant.id,
                    description: tenant.description,
                    created_at: now,
                })
                .await;
            report.tenants += counted(inserted)?;
        }

        for user in self.users {
            let inserted = store
                .insert_user(User {
                    password_hash: hash_password(&user.password),
                    id: user.id,
                    tenant_id: user.tenant_id,
                    email: user.email,
                    enabled: user.enabled,
                })
                .await;
            report.users += counted(inserted)?;
        }

        for token in self.tokens {
            let expires_at = token.expiry(now)?;
            let inserted = store
                .insert_token(Token {
                    id: token.id,
                    user_id: token.user_id,
                    tenant_id: token.tenant_id,
                    issued_at: now,
                    expires_at,
                    revoked: token.revoked,
                })
                .await;
            report.tokens += counted(inserted)?;
        }

        if store.list_templates().await?.is_empty() {
            for spec in self.templates {
                let template = validate_spec(spec).map_err(|e| anyhow::anyhow!("{}", e))?;
                store.insert_template(template).await?;
                report.templates += 1;
            }
        }

        tracing::info!(
            tenants = report.tenants,
            users = report.users,
            tokens = report.tokens,
            templates = report.templates,
            "seed applied"
        );
        Ok(report)
    }
}

fn counted<T>(result: Result<T, StoreError>) -> anyhow::Result<usize> {
    match result {
        Ok(_) => Ok(1),
        Err(StoreError::Conflict(what)) => {
            tracing::debug!("seed: {} already present, skipping", what);
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}
