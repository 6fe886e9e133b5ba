//! Background job: destroy long-expired tokens.
//!
//! An expired token still classifies as expired (403) until it is older
//! than the retention period; after the purge the same credential is
//! unrecognized (404).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time;

use crate::store::{IdentityStore, TokenStore};

/// Spawn the background cleanup task. Call this once at startup.
///
/// The first pass runs one full `every` after startup, not immediately.
pub fn spawn(
    store: Arc<dyn IdentityStore>,
    every: Duration,
    retention: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(time::Instant::now() + every, every);
        loop {
            interval.tick().await;
            if let Err(e) = purge_expired_tokens(store.as_ref(), retention, Utc::now()).await {
                tracing::error!("cleanup job failed: {}", e);
            }
        }
    })
}

/// Delete tokens that expired more than `retention` before `now`.
pub async fn purge_expired_tokens(
    store: &dyn IdentityStore,
    retention: chrono::Duration,
    now: DateTime<Utc>,
) -> anyhow::Result<u64> {
    let cutoff = now
        .checked_sub_signed(retention)
        .context("token retention out of range")?;
    let purged = store.purge_tokens_expired_before(cutoff).await?;
    if purged > 0 {
        tracing::info!(rows = purged, "purged expired tokens past retention");
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::validator::{TokenState, TokenValidator};
    use crate::models::directory::User;
    use crate::models::token::Token;
    use crate::store::memory::MemoryStore;
    use crate::store::DirectoryStore;

    #[tokio::test]
    async fn test_purge_turns_expired_into_unrecognized() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(User {
                id: "joeuser".into(),
                tenant_id: None,
                email: None,
                password_hash: String::new(),
                enabled: true,
            })
            .await
            .unwrap();

        let now = Utc::now();
        for (id, expired_ago) in [("recent", chrono::Duration::hours(1)), ("ancient", chrono::Duration::days(30))] {
            store
                .insert_token(Token {
                    id: id.into(),
                    user_id: "joeuser".into(),
                    tenant_id: None,
                    issued_at: now - chrono::Duration::days(60),
                    expires_at: now - expired_ago,
                    revoked: false,
                })
                .await
                .unwrap();
        }

        let purged = purge_expired_tokens(store.as_ref(), chrono::Duration::days(7), now)
            .await
            .unwrap();
        assert_eq!(purged, 1);

        let validator = TokenValidator::new(store.clone());
        assert_eq!(validator.validate(Some("recent")).await.unwrap(), TokenState::Expired);
        assert_eq!(
            validator.validate(Some("ancient")).await.unwrap(),
            TokenState::Unrecognized
        );
    }

    #[tokio::test]
    async fn test_spawned_job_does_not_purge_at_startup() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(User {
                id: "joeuser".into(),
                tenant_id: None,
                email: None,
                password_hash: String::new(),
                enabled: true,
            })
            .await
            .unwrap();
        let now = Utc::now();
        store
            .insert_token(Token {
                id: "ancient".into(),
                user_id: "joeuser".into(),
                tenant_id: None,
                issued_at: now - chrono::Duration::days(60),
                expires_at: now - chrono::Duration::days(30),
                revoked: false,
            })
            .await
            .unwrap();

        let handle = spawn(
            store.clone(),
            Duration::from_secs(3600),
            chrono::Duration::days(7),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let validator = TokenValidator::new(store.clone());
        assert_eq!(validator.validate(Some("ancient")).await.unwrap(), TokenState::Expired);
    }
}
