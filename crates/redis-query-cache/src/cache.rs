//! The cache adapter: one instance per cache space, all sharing a store.
//!
//! Each [`QueryCache`] fronts a single named container in the remote store
//! and exposes the five second-level cache operations. The adapter never
//! lets connectivity failures reach the caller: every store outage is
//! logged once per operation and converted to that operation's degraded
//! default (empty size, silent put/clear, miss, "not removed"). The cache
//! layer above treats those defaults exactly like a cold cache, so a Redis
//! outage costs performance, not correctness.
//!
//! Fatal errors are different and do reach the caller: a configuration
//! value that fails type coercion, or a value JSON cannot represent, or
//! stored bytes that no longer match the requested type. Degrading those
//! would hide a real defect behind outage behavior.

use crate::codec;
use crate::error::{Error, Result};
use crate::key;
use crate::provider::ConnectionProvider;
use crate::store::{RedisSpaceStore, SpaceStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A named second-level cache space over a shared store.
///
/// Cheap to clone; clones address the same space through the same store.
#[derive(Clone)]
pub struct QueryCache {
    id: String,
    store: Arc<dyn SpaceStore>,
    lock: Arc<RwLock<()>>,
}

impl QueryCache {
    /// Cache space `id` over an explicit store.
    ///
    /// The id is normalized (see [`key::normalize`]) so spacing variants of
    /// the same logical id address the same container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `id` is empty: a cache space must
    /// be addressable.
    pub fn new(id: &str, store: Arc<dyn SpaceStore>) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::InvalidInput(
                "Cache instances require an ID".to_string(),
            ));
        }
        Ok(Self {
            id: key::normalize(id),
            store,
            lock: Arc::new(RwLock::new(())),
        })
    }

    /// Cache space `id` backed by Redis through a shared provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `id` is empty.
    pub fn with_provider(id: &str, provider: Arc<ConnectionProvider>) -> Result<Self> {
        Self::new(id, Arc::new(RedisSpaceStore::new(provider)))
    }

    /// The normalized cache-space id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Advisory read/write lock for callers that coordinate around this
    /// space. The cache itself never takes it; operations are as atomic as
    /// the underlying store commands.
    #[must_use]
    pub fn read_write_lock(&self) -> Arc<RwLock<()>> {
        Arc::clone(&self.lock)
    }

    /// Number of entries in this space. Degrades to `0` when the store is
    /// unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if configuration resolution failed.
    pub async fn size(&self) -> Result<usize> {
        match self.store.field_count(&self.id).await {
            Ok(count) => Ok(usize::try_from(count).unwrap_or(usize::MAX)),
            Err(e) => self.degraded("size", e, 0),
        }
    }

    /// Store `value` under `key`, or the nil marker for `None`.
    ///
    /// Caching `None` records a confirmed absence, so repeated lookups of a
    /// key known to have no result hit the cache instead of the source.
    /// Degrades to a no-op when the store is unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `value` is not representable,
    /// or [`Error::Configuration`] if configuration resolution failed.
    pub async fn put<T: Serialize>(&self, raw_key: &str, value: Option<&T>) -> Result<()> {
        let field = key::normalize(raw_key);
        let bytes = match value {
            Some(value) => codec::encode(value)?,
            None => codec::NIL_MARKER.to_vec(),
        };
        match self.store.field_put(&self.id, &field, bytes).await {
            Ok(()) => {
                debug!(cache = %self.id, key = %field, "put");
                Ok(())
            }
            Err(e) => self.degraded("put", e, ()),
        }
    }

    /// Fetch the value under `key`.
    ///
    /// Returns `Ok(None)` for a miss, a cached absence, or an unavailable
    /// store; the caller cannot distinguish them and falls through to the
    /// source in each case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if stored bytes do not decode to
    /// `T` (stale foreign data fails loudly instead of returning a mangled
    /// value), or [`Error::Configuration`] if configuration resolution
    /// failed.
    pub async fn get<T: DeserializeOwned>(&self, raw_key: &str) -> Result<Option<T>> {
        let field = key::normalize(raw_key);
        match self.store.field_get(&self.id, &field).await {
            Ok(Some(bytes)) => {
                let value = codec::decode(&bytes)?;
                debug!(cache = %self.id, key = %field, hit = value.is_some(), "get");
                Ok(value)
            }
            Ok(None) => {
                debug!(cache = %self.id, key = %field, hit = false, "get");
                Ok(None)
            }
            Err(e) => self.degraded("get", e, None),
        }
    }

    /// Remove the entry under `key`, reporting whether it existed.
    /// Degrades to `false` when the store is unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if configuration resolution failed.
    pub async fn remove(&self, raw_key: &str) -> Result<bool> {
        let field = key::normalize(raw_key);
        match self.store.field_remove(&self.id, &field).await {
            Ok(removed) => {
                debug!(cache = %self.id, key = %field, removed, "remove");
                Ok(removed)
            }
            Err(e) => self.degraded("remove", e, false),
        }
    }

    /// Drop every entry in this space. Degrades to a no-op when the store
    /// is unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if configuration resolution failed.
    pub async fn clear(&self) -> Result<()> {
        match self.store.drop_space(&self.id).await {
            Ok(()) => {
                debug!(cache = %self.id, "clear");
                Ok(())
            }
            Err(e) => self.degraded("clear", e, ()),
        }
    }

    /// Map a store failure to the operation's degraded default, except for
    /// fatal setup errors, which keep propagating.
    fn degraded<T>(&self, op: &str, e: StoreError, default: T) -> Result<T> {
        match e {
            StoreError::Fatal(e) => Err(e),
            e => {
                warn!(cache = %self.id, op, error = %e, "store unavailable, degraded default");
                Ok(default)
            }
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache").field("id", &self.id).finish()
    }
}

impl std::fmt::Display for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Redis {{{}}}", self.id)
    }
}
