//! Redis-backed second-level query-result cache.
//!
//! This crate provides a shared cache for query results: many cache spaces
//! (one per statement namespace or mapper) over a single Redis connection,
//! so every process instance behind a load balancer sees the same cached
//! rows.
//!
//! ## Design
//!
//! - **One hash per cache space.** Each [`QueryCache`] maps to a single
//!   Redis hash; entry keys become hash fields. `clear()` is one `DEL`.
//! - **Lazy, one-time configuration.** The shared [`ConnectionProvider`]
//!   resolves settings on first use from layered sources
//!   (`application.yml`, `application.properties`, `redis.properties`,
//!   built-in defaults) and never re-reads them. See [`ConfigSources`].
//! - **Graceful degradation.** An unreachable Redis never fails a query:
//!   each operation logs the outage and returns its safe default (empty
//!   size, miss, silent put). Only configuration and serialization errors
//!   surface, because silently defaulting those would hide real bugs.
//! - **Negative caching.** `put(key, None)` stores a reserved nil marker,
//!   so keys confirmed absent stop hammering the backing source. See
//!   [`codec`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use redis_query_cache::{ConfigSources, ConnectionProvider, QueryCache};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // One provider per process, shared by every cache space.
//! let provider = Arc::new(ConnectionProvider::new(ConfigSources::new(".")));
//!
//! let users = QueryCache::with_provider("com.example.UserMapper", Arc::clone(&provider))?;
//!
//! users.put("findById(42)", Some(&("alice", 42))).await?;
//! let hit: Option<(String, u32)> = users.get("findById(42)").await?;
//! assert!(hit.is_some());
//!
//! // A key confirmed absent is cached too.
//! users.put::<()>("findById(7)", None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! For tests and single-process setups, [`MemorySpaceStore`] is a drop-in
//! backend with the same semantics minus the network.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod provider;
pub mod store;

pub use cache::QueryCache;
pub use config::{ConfigSources, RedisConfig};
pub use error::{Error, Result};
pub use provider::ConnectionProvider;
pub use store::{MemorySpaceStore, RedisSpaceStore, SpaceStore, StoreError, StoreResult};
