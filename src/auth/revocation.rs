//! Revoked token storage.
//!
//! Tokens stay valid cryptographically until their embedded expiry, so logout
//! writes the raw token into a shared store with a TTL equal to the token's
//! remaining validity window. Presence in the store means revoked; records
//! self-expire exactly when the token would have expired naturally.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;

const KEY_PREFIX: &str = "revoked_token:";

fn revocation_key(token: &str) -> String {
    format!("{}{}", KEY_PREFIX, token)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Shared revocation store interface.
///
/// Backed by Redis in production and by an in-memory map in tests; each token
/// key is read and written independently, so single-key atomicity is all the
/// store has to provide.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark `token` as revoked for `ttl`. Idempotent.
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Check whether `token` has been revoked. Called on every authenticated
    /// request, so lookups must stay cheap.
    async fn is_revoked(&self, token: &str) -> Result<bool, StoreError>;
}

/// Redis-backed store: `SET key 1 EX ttl` on revoke, `EXISTS` on lookup.
pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // Redis rejects a zero TTL; clamp up to one second.
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(revocation_key(token), 1u8, secs)
            .await?;
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(revocation_key(token)).await?;
        Ok(exists)
    }
}

/// In-memory store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(revocation_key(token), Instant::now() + ttl);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let key = revocation_key(token);
        match entries.get(&key) {
            Some(expires_at) if *expires_at > Instant::now() => Ok(true),
            Some(_) => {
                // Record outlived the token; drop it like Redis would.
                entries.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_token_is_not_revoked() {
        let store = MemoryRevocationStore::new();
        assert!(!store.is_revoked("abc").await.unwrap());
    }

    #[tokio::test]
    async fn revoked_token_is_flagged_until_ttl_elapses() {
        let store = MemoryRevocationStore::new();
        store
            .revoke("abc", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(store.is_revoked("abc").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!store.is_revoked("abc").await.unwrap());
    }

    #[tokio::test]
    async fn revocation_is_idempotent() {
        let store = MemoryRevocationStore::new();
        store.revoke("abc", Duration::from_secs(60)).await.unwrap();
        store.revoke("abc", Duration::from_secs(60)).await.unwrap();
        assert!(store.is_revoked("abc").await.unwrap());
    }
}
