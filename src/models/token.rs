use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An issued credential.
///
/// The presented `X-Auth-Token` value is the token `id`. Whether a token is
/// usable is never stored; it is computed at request time by
/// `middleware::validator::classify` from `expires_at`, `revoked` and the
/// owning user's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set by an administrator; a revoked token classifies as disabled.
    pub revoked: bool,
}

impl Token {
    /// Issue a fresh token for `user_id` valid for `ttl` from `now`. An
    /// expiry past the representable range saturates.
    pub fn issue(user_id: &str, tenant_id: Option<&str>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_token_id(),
            user_id: user_id.to_string(),
            tenant_id: tenant_id.map(String::from),
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            revoked: false,
        }
    }
}

/// 128 bits from the OS RNG, hex encoded.
pub fn generate_token_id() -> String {
    let mut random_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut random_bytes);
    hex::encode(random_bytes)
}

/// Mask a credential for logs: keep the first and last four characters.
pub fn mask(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        "****".to_string()
    }
}
