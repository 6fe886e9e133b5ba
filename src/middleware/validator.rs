//! Token Validator: classifies a presented credential.
//!
//! Evaluation order is fixed: Missing → Unrecognized → Disabled → Expired →
//! Valid. A credential must exist before its disablement or expiry is even
//! looked at, and disablement wins over expiry.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::models::directory::User;
use crate::models::token::Token;
use crate::store::{DirectoryStore, IdentityStore, StoreResult, TokenStore};

/// Request header carrying the credential.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// The resolved identity behind a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Exactly one of these applies to a credential at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Valid(Principal),
    Expired,
    Disabled,
    Missing,
    Unrecognized,
}

impl TokenState {
    pub fn label(&self) -> &'static str {
        match self {
            TokenState::Valid(_) => "valid",
            TokenState::Expired => "expired",
            TokenState::Disabled => "disabled",
            TokenState::Missing => "missing",
            TokenState::Unrecognized => "unrecognized",
        }
    }
}

/// Pull the credential out of the request headers. Absent, empty and
/// whitespace-only values are all "no credential". A value that is not
/// valid header text is still a credential; it just will not match.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTH_TOKEN_HEADER)?;
    let value = match raw.to_str() {
        Ok(s) => s.trim().to_string(),
        Err(_) => String::from_utf8_lossy(raw.as_bytes()).trim().to_string(),
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Classify a stored token. `owner` is the token's user as currently
/// stored, `None` if the user no longer exists.
pub fn classify(token: &Token, owner: Option<&User>, now: DateTime<Utc>) -> TokenState {
    let owner_enabled = owner.map(|u| u.enabled).unwrap_or(false);
    if token.revoked || !owner_enabled {
        return TokenState::Disabled;
    }
    if token.expires_at <= now {
        return TokenState::Expired;
    }
    TokenState::Valid(Principal {
        user_id: token.user_id.clone(),
        tenant_id: token.tenant_id.clone(),
        token_id: token.id.clone(),
        expires_at: token.expires_at,
    })
}

/// Read-only classification over the token store. Safe to run from any
/// number of requests in parallel.
#[derive(Clone)]
pub struct TokenValidator {
    store: Arc<dyn IdentityStore>,
}

impl TokenValidator {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub async fn validate(&self, credential: Option<&str>) -> StoreResult<TokenState> {
        self.validate_at(credential, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<TokenState> {
        let Some(credential) = credential.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(TokenState::Missing);
        };

        let Some(token) = self.store.get_token(credential).await? else {
            return Ok(TokenState::Unrecognized);
        };

        let owner = self.store.get_user(&token.user_id).await?;
        Ok(classify(&token, owner.as_ref(), now))
    }
}
