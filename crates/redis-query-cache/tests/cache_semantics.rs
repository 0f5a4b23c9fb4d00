//! End-to-end cache semantics over the in-memory store, plus degraded-mode
//! behavior over a store that always fails.

use async_trait::async_trait;
use redis_query_cache::{
    ConfigSources, ConnectionProvider, Error, MemorySpaceStore, QueryCache, SpaceStore,
    StoreError, StoreResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OrderRow {
    id: u64,
    customer: String,
    total_cents: i64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn order(id: u64) -> OrderRow {
    OrderRow {
        id,
        customer: format!("customer-{id}"),
        total_cents: 1250 * id as i64,
    }
}

#[tokio::test]
async fn put_get_remove_clear_lifecycle() {
    let cache = QueryCache::new("orders", Arc::new(MemorySpaceStore::new())).unwrap();

    assert_eq!(cache.size().await.unwrap(), 0);
    assert_eq!(cache.get::<OrderRow>("findById(1)").await.unwrap(), None);

    cache.put("findById(1)", Some(&order(1))).await.unwrap();
    cache.put("findById(2)", Some(&order(2))).await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 2);
    assert_eq!(
        cache.get::<OrderRow>("findById(1)").await.unwrap(),
        Some(order(1))
    );

    assert!(cache.remove("findById(1)").await.unwrap());
    assert!(!cache.remove("findById(1)").await.unwrap());
    assert_eq!(cache.size().await.unwrap(), 1);

    cache.clear().await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 0);
    assert_eq!(cache.get::<OrderRow>("findById(2)").await.unwrap(), None);
}

#[tokio::test]
async fn cached_absence_persists_until_evicted() {
    let cache = QueryCache::new("orders", Arc::new(MemorySpaceStore::new())).unwrap();

    cache.put::<OrderRow>("findById(404)", None).await.unwrap();

    // Reads back as absent but counts as an entry, so the lookup path can
    // stop at the cache instead of re-querying the source.
    assert_eq!(cache.get::<OrderRow>("findById(404)").await.unwrap(), None);
    assert_eq!(cache.size().await.unwrap(), 1);

    assert!(cache.remove("findById(404)").await.unwrap());
    assert_eq!(cache.size().await.unwrap(), 0);
}

#[tokio::test]
async fn overwrite_replaces_previous_value() {
    let cache = QueryCache::new("orders", Arc::new(MemorySpaceStore::new())).unwrap();

    cache.put("findById(1)", Some(&order(1))).await.unwrap();
    let updated = OrderRow {
        customer: "renamed".to_string(),
        ..order(1)
    };
    cache.put("findById(1)", Some(&updated)).await.unwrap();

    assert_eq!(
        cache.get::<OrderRow>("findById(1)").await.unwrap(),
        Some(updated)
    );
    assert_eq!(cache.size().await.unwrap(), 1);

    // A real value can also be overwritten by a confirmed absence.
    cache.put::<OrderRow>("findById(1)", None).await.unwrap();
    assert_eq!(cache.get::<OrderRow>("findById(1)").await.unwrap(), None);
    assert_eq!(cache.size().await.unwrap(), 1);
}

#[tokio::test]
async fn spacing_variants_share_one_container() {
    // Two adapter instances whose ids differ only in spacing, over one
    // shared store, must address the same entries.
    let store = MemorySpaceStore::new();
    let a = QueryCache::new("user, profile", Arc::new(store.clone())).unwrap();
    let b = QueryCache::new("user,  profile", Arc::new(store)).unwrap();
    assert_eq!(a.id(), b.id());

    a.put("findAll()", Some(&vec![order(1)])).await.unwrap();
    assert_eq!(
        b.get::<Vec<OrderRow>>("findAll()").await.unwrap(),
        Some(vec![order(1)])
    );

    // Entry keys normalize the same way.
    a.put("byName( 'x',  'y' )", Some(&order(2))).await.unwrap();
    assert_eq!(
        b.get::<OrderRow>("byName( 'x', 'y' )").await.unwrap(),
        Some(order(2))
    );
}

#[tokio::test]
async fn distinct_ids_are_isolated() {
    let store = MemorySpaceStore::new();
    let orders = QueryCache::new("orders", Arc::new(store.clone())).unwrap();
    let users = QueryCache::new("users", Arc::new(store)).unwrap();

    orders.put("k", Some(&1_i32)).await.unwrap();
    users.put("k", Some(&2_i32)).await.unwrap();

    assert_eq!(orders.get::<i32>("k").await.unwrap(), Some(1));
    assert_eq!(users.get::<i32>("k").await.unwrap(), Some(2));

    orders.clear().await.unwrap();
    assert_eq!(orders.size().await.unwrap(), 0);
    assert_eq!(users.size().await.unwrap(), 1);
}

#[tokio::test]
async fn serialization_error_surfaces_from_put() {
    let cache = QueryCache::new("orders", Arc::new(MemorySpaceStore::new())).unwrap();

    // JSON object keys must be strings.
    let mut bad: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
    bad.insert(vec![1, 2], 3);

    let err = cache.put("k", Some(&bad)).await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    // Nothing was stored.
    assert_eq!(cache.size().await.unwrap(), 0);
}

#[tokio::test]
async fn type_mismatch_surfaces_from_get() {
    let cache = QueryCache::new("orders", Arc::new(MemorySpaceStore::new())).unwrap();
    cache.put("k", Some(&order(1))).await.unwrap();

    let err = cache.get::<Vec<String>>("k").await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

/// A store whose every operation fails, standing in for an unreachable
/// Redis. The adapter must absorb all five failures.
struct DownStore;

#[async_trait]
impl SpaceStore for DownStore {
    async fn field_get(&self, _: &str, _: &str) -> StoreResult<Option<Vec<u8>>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn field_put(&self, _: &str, _: &str, _: Vec<u8>) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn field_remove(&self, _: &str, _: &str) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn field_count(&self, _: &str) -> StoreResult<u64> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn drop_space(&self, _: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn unavailable_store_degrades_every_operation() {
    init_tracing();
    let cache = QueryCache::new("orders", Arc::new(DownStore)).unwrap();

    assert_eq!(cache.size().await.unwrap(), 0);
    cache.put("k", Some(&order(1))).await.unwrap();
    assert_eq!(cache.get::<OrderRow>("k").await.unwrap(), None);
    assert!(!cache.remove("k").await.unwrap());
    cache.clear().await.unwrap();
}

#[tokio::test]
async fn fatal_config_error_propagates_through_every_operation() {
    // A malformed explicit override must not behave like an outage: every
    // operation reports the configuration error instead of degrading.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("redis.properties"), "port=banana\n").unwrap();
    let provider = Arc::new(ConnectionProvider::new(ConfigSources::new(dir.path())));
    let cache = QueryCache::with_provider("orders", provider).unwrap();

    assert!(matches!(
        cache.put("k", Some(&1_i32)).await,
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        cache.get::<i32>("k").await,
        Err(Error::Configuration(_))
    ));
    assert!(matches!(cache.size().await, Err(Error::Configuration(_))));
    assert!(matches!(cache.remove("k").await, Err(Error::Configuration(_))));
    assert!(matches!(cache.clear().await, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn serialization_still_fails_when_store_is_down() {
    // Encoding happens before the store is touched, so a caller bug is
    // reported even in degraded mode.
    let cache = QueryCache::new("orders", Arc::new(DownStore)).unwrap();
    let mut bad: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
    bad.insert(vec![1], 2);
    assert!(cache.put("k", Some(&bad)).await.is_err());
}
