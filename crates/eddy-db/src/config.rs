//! Configuration for the store query layer.

use eddy_core::pool::PoolConfig;

/// Default number of runtimes a registry keeps before evicting.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 50;

/// Configuration for a [`StoreQueryRegistry`](crate::StoreQueryRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQueryConfig {
    /// Runtimes kept before the least recently used one is evicted.
    pub registry_capacity: usize,
    /// Pool used for aggregate-backed runtimes built through the registry.
    pub event_pool: PoolConfig,
}

impl Default for StoreQueryConfig {
    fn default() -> Self {
        Self {
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            event_pool: PoolConfig::for_aggregation(0),
        }
    }
}

impl StoreQueryConfig {
    /// Sets the registry capacity (at least 1).
    #[must_use]
    pub fn with_registry_capacity(mut self, capacity: usize) -> Self {
        self.registry_capacity = capacity.max(1);
        self
    }

    /// Sets the aggregation event pool configuration.
    #[must_use]
    pub fn with_event_pool(mut self, pool: PoolConfig) -> Self {
        self.event_pool = pool;
        self
    }
}
