//! Lazy, process-wide resolution of the shared Redis client handle.
//!
//! Nothing touches the network at construction: the first cache operation
//! triggers configuration resolution (at most once, see
//! [`crate::config::ConfigSources`]) and client construction. Concurrent
//! first callers are serialized by `OnceCell`, so only one client handle is
//! ever built and losers observe the winner's value.
//!
//! Configuration is never re-resolved, even if the store becomes
//! unreachable and later recovers; reconnection is the connection
//! manager's own concern. A *failed* client build, however, is not cached:
//! the next operation attempts it fresh, so a store that comes up late is
//! eventually picked up.

use crate::config::{ConfigSources, RedisConfig};
use crate::error::Result;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Provides the single shared connection handle for all cache instances.
///
/// Construct one per process and share it (`Arc`) across every
/// [`crate::QueryCache`].
pub struct ConnectionProvider {
    sources: ConfigSources,
    config: OnceCell<RedisConfig>,
    manager: OnceCell<ConnectionManager>,
    injected: Option<ConnectionManager>,
}

impl std::fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("resolved", &self.config.get().is_some())
            .field("connected", &self.manager.get().is_some())
            .field("injected", &self.injected.is_some())
            .finish()
    }
}

impl ConnectionProvider {
    /// Lazy provider resolving its configuration from `sources` on first use.
    #[must_use]
    pub fn new(sources: ConfigSources) -> Self {
        Self {
            sources,
            config: OnceCell::new(),
            manager: OnceCell::new(),
            injected: None,
        }
    }

    /// Provider over a client handle obtained elsewhere (e.g. from a managed
    /// application context). Configuration files are never probed.
    #[must_use]
    pub fn with_client(manager: ConnectionManager) -> Self {
        Self {
            sources: ConfigSources::new("."),
            config: OnceCell::new(),
            manager: OnceCell::new(),
            injected: Some(manager),
        }
    }

    /// The resolved configuration, resolving it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if an explicit override fails
    /// type coercion. This is fatal and will be returned again on every
    /// subsequent call; it is never silently defaulted.
    pub async fn config(&self) -> Result<&RedisConfig> {
        self.config
            .get_or_try_init(|| async { self.sources.resolve() })
            .await
    }

    /// A live connection handle, or `None` when the store is unreachable.
    ///
    /// `Ok(None)` is the degraded-mode signal: the failure has already been
    /// logged and the caller should fall back to its documented no-op/miss
    /// behavior.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal configuration failures, never for
    /// connectivity.
    pub async fn connection(&self) -> Result<Option<ConnectionManager>> {
        if let Some(manager) = &self.injected {
            return Ok(Some(manager.clone()));
        }

        let config = self.config().await?;
        match self
            .manager
            .get_or_try_init(|| Self::build_manager(config))
            .await
        {
            Ok(manager) => Ok(Some(manager.clone())),
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "redis unavailable, cache degraded");
                Ok(None)
            }
        }
    }

    async fn build_manager(config: &RedisConfig) -> redis::RedisResult<ConnectionManager> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.database,
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connection_timeout)
            .set_response_timeout(config.so_timeout)
            .set_number_of_retries(3);
        let manager = ConnectionManager::new_with_config(client, manager_config).await?;
        debug!(host = %config.host, port = config.port, db = config.database, "redis connection established");
        Ok(manager)
    }
}
