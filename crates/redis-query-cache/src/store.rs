//! Store-access seam between the cache adapter and the remote store.
//!
//! Every backend speaks the same five hash-field operations, and every
//! connectivity failure is a typed [`StoreError::Unavailable`] outcome
//! rather than an exception bubbling through the adapter. The adapter maps
//! that outcome to each operation's documented degraded default, which
//! keeps the "never throw to the caller" contract explicit and testable.
//!
//! Two implementations ship:
//!
//! - [`RedisSpaceStore`] - the canonical backend over the shared
//!   [`ConnectionProvider`];
//! - [`MemorySpaceStore`] - a `HashMap`-backed twin for development,
//!   testing, and short-lived processes.

use crate::provider::ConnectionProvider;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Result type for store-access operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure outcome of a store access.
///
/// `Unavailable` never crosses the cache adapter boundary: the adapter
/// converts it to the operation's degraded default after logging. `Fatal`
/// wraps setup errors that must keep propagating, a malformed explicit
/// override must never behave like an outage.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote store is unreachable or the operation timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A fatal setup error, reported verbatim to the caller.
    #[error(transparent)]
    Fatal(#[from] crate::error::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Hash-field operations over named cache-space containers.
///
/// `space` is the normalized cache-space id; `field` is a normalized entry
/// key. Each operation is atomic only at the granularity the backing store
/// guarantees for a single hash-field command; no multi-key
/// transactionality is provided.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// Fetch the raw bytes stored under `field`, if any.
    async fn field_get(&self, space: &str, field: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `field`, overwriting any previous entry.
    async fn field_put(&self, space: &str, field: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Delete the single entry under `field`, reporting whether it existed.
    async fn field_remove(&self, space: &str, field: &str) -> StoreResult<bool>;

    /// Number of entries in the space's container.
    async fn field_count(&self, space: &str) -> StoreResult<u64>;

    /// Delete the entire container for `space`.
    async fn drop_space(&self, space: &str) -> StoreResult<()>;
}

/// Redis-backed store: one hash per cache space.
pub struct RedisSpaceStore {
    provider: Arc<ConnectionProvider>,
}

impl RedisSpaceStore {
    /// Store over the process-wide shared connection provider.
    #[must_use]
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// A live connection, or `Unavailable` when the provider is degraded.
    ///
    /// A fatal configuration error from the provider stays fatal: it comes
    /// back as [`StoreError::Fatal`] so the adapter propagates it instead
    /// of degrading.
    async fn connection(&self) -> StoreResult<redis::aio::ConnectionManager> {
        match self.provider.connection().await {
            Ok(Some(manager)) => Ok(manager),
            Ok(None) => Err(StoreError::Unavailable("no connection".to_string())),
            Err(e) => Err(StoreError::Fatal(e)),
        }
    }
}

#[async_trait]
impl SpaceStore for RedisSpaceStore {
    async fn field_get(&self, space: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.hget(space, field).await?;
        Ok(value)
    }

    async fn field_put(&self, space: &str, field: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        conn.hset::<_, _, _, ()>(space, field, value).await?;
        Ok(())
    }

    async fn field_remove(&self, space: &str, field: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.hdel(space, field).await?;
        Ok(removed > 0)
    }

    async fn field_count(&self, space: &str) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.hlen(space).await?;
        Ok(count)
    }

    async fn drop_space(&self, space: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(space).await?;
        Ok(())
    }
}

type SpaceMap = HashMap<String, HashMap<String, Vec<u8>>>;

/// In-memory store keeping each cache space in its own `HashMap`.
///
/// Clones share the underlying map, so one instance can back many cache
/// spaces the same way the Redis store does.
#[derive(Debug, Clone, Default)]
pub struct MemorySpaceStore {
    spaces: Arc<RwLock<SpaceMap>>,
}

impl MemorySpaceStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpaceStore for MemorySpaceStore {
    async fn field_get(&self, space: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        let spaces = self.spaces.read().await;
        Ok(spaces.get(space).and_then(|s| s.get(field)).cloned())
    }

    async fn field_put(&self, space: &str, field: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut spaces = self.spaces.write().await;
        spaces
            .entry(space.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn field_remove(&self, space: &str, field: &str) -> StoreResult<bool> {
        let mut spaces = self.spaces.write().await;
        Ok(spaces
            .get_mut(space)
            .is_some_and(|s| s.remove(field).is_some()))
    }

    async fn field_count(&self, space: &str) -> StoreResult<u64> {
        let spaces = self.spaces.read().await;
        Ok(spaces.get(space).map_or(0, |s| s.len() as u64))
    }

    async fn drop_space(&self, space: &str) -> StoreResult<()> {
        let mut spaces = self.spaces.write().await;
        spaces.remove(space);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_basic() {
        let store = MemorySpaceStore::new();

        assert_eq!(store.field_get("s", "k").await.unwrap(), None);
        assert_eq!(store.field_count("s").await.unwrap(), 0);

        store.field_put("s", "k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.field_get("s", "k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.field_count("s").await.unwrap(), 1);

        assert!(store.field_remove("s", "k").await.unwrap());
        assert!(!store.field_remove("s", "k").await.unwrap());
        assert_eq!(store.field_get("s", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_spaces_are_isolated() {
        let store = MemorySpaceStore::new();
        store.field_put("a", "k", b"1".to_vec()).await.unwrap();
        store.field_put("b", "k", b"2".to_vec()).await.unwrap();

        assert_eq!(store.field_get("a", "k").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.field_get("b", "k").await.unwrap(), Some(b"2".to_vec()));

        store.drop_space("a").await.unwrap();
        assert_eq!(store.field_count("a").await.unwrap(), 0);
        assert_eq!(store.field_count("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_store_clones_share_data() {
        let store = MemorySpaceStore::new();
        let clone = store.clone();

        store.field_put("s", "k", b"v".to_vec()).await.unwrap();
        assert_eq!(clone.field_get("s", "k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemorySpaceStore::new();
        store.field_put("s", "k", b"old".to_vec()).await.unwrap();
        store.field_put("s", "k", b"new".to_vec()).await.unwrap();
        assert_eq!(
            store.field_get("s", "k").await.unwrap(),
            Some(b"new".to_vec())
        );
        assert_eq!(store.field_count("s").await.unwrap(), 1);
    }
}
