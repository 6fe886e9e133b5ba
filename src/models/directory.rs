//! Tenants and users: the minimal directory needed to own endpoints and
//! authenticate principals.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Scoping unit owning zero or more endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A principal that can authenticate and own tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub enabled: bool,
}

/// Hash a password as `salt$hex(sha256(salt || password))`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    format!("{}${}", salt, digest(&salt, password))
}

/// Check `candidate` against a hash produced by [`hash_password`].
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let actual = digest(salt, candidate);
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Shaped like a [`hash_password`] result; no password digests to it.
const UNKNOWN_PRINCIPAL_HASH: &str = concat!(
    "00000000000000000000000000000000",
    "$",
    "0000000000000000000000000000000000000000000000000000000000000000",
);

/// Do the work of [`verify_password`] for a username that does not exist,
/// so a failed login takes as long whether or not the user is known.
/// Always false.
pub fn verify_unknown_principal(candidate: &str) -> bool {
    verify_password(UNKNOWN_PRINCIPAL_HASH, candidate)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
