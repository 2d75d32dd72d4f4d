//! Registry of built store query runtimes.
//!
//! Keeps runtimes by query name so repeated ad-hoc calls reuse the compiled
//! runtime. The registry is bounded; when full, the least recently used
//! runtime is evicted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use eddy_core::event::Row;
use eddy_core::pool::{EventSource, StateEventPool};
use eddy_core::schema::{Attribute, EventType, StreamSchema};
use fxhash::FxHashMap;
use parking_lot::Mutex;

use crate::builder::StoreQueryRuntimeBuilder;
use crate::config::StoreQueryConfig;
use crate::error::StoreQueryError;
use crate::runtime::{StoreQueryKind, StoreQueryRuntime};

/// Counters for a [`StoreQueryRegistry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryMetrics {
    /// Successful `execute()` calls.
    pub executions: u64,
    /// Failed `execute()` or `reset()` calls.
    pub failures: u64,
    /// Successful `reset()` calls.
    pub resets: u64,
    /// Runtimes evicted to stay within capacity.
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    executions: AtomicU64,
    failures: AtomicU64,
    resets: AtomicU64,
    evictions: AtomicU64,
}

struct Entry {
    runtime: Arc<dyn StoreQueryRuntime>,
    last_used: u64,
}

#[derive(Default)]
struct RegistryState {
    entries: FxHashMap<String, Entry>,
    clock: u64,
}

impl RegistryState {
    fn touch(&mut self, name: &str) -> Option<Arc<dyn StoreQueryRuntime>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(name).map(|entry| {
            entry.last_used = clock;
            Arc::clone(&entry.runtime)
        })
    }

    fn evict_lru(&mut self) -> Option<String> {
        let name = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(name, _)| name.clone())?;
        self.entries.remove(&name);
        Some(name)
    }
}

/// Bounded, thread-safe registry of store query runtimes.
///
/// Runtimes are executed outside the registry lock, so a slow table
/// operation never blocks lookups of other queries.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use eddy_core::schema::{Attribute, AttributeType, EventType, StreamSchema};
/// use eddy_core::table::{Condition, InMemoryTable, TableAction, TableSelector};
/// use eddy_db::{StoreQueryConfig, StoreQueryKind, StoreQueryRegistry};
///
/// let attrs = vec![Attribute::new("id", AttributeType::Int)];
/// let table = Arc::new(InMemoryTable::new("ids", attrs.clone(), "id").unwrap());
/// let registry = StoreQueryRegistry::new(StoreQueryConfig::default());
///
/// let schema = StreamSchema::new(EventType::Table, attrs);
/// let find = TableAction::Find { condition: Condition::All };
/// let runtime = registry
///     .runtime_builder(StoreQueryKind::Find, "all", schema)
///     .selector(Arc::new(TableSelector::new(table, find)))
///     .build()
///     .unwrap();
/// registry.register(runtime).unwrap();
///
/// assert!(registry.execute("all").unwrap().is_empty());
/// assert_eq!(registry.metrics().executions, 1);
/// ```
pub struct StoreQueryRegistry {
    config: StoreQueryConfig,
    state: Mutex<RegistryState>,
    aggregation_pool: Arc<StateEventPool>,
    counters: Counters,
}

impl StoreQueryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: StoreQueryConfig) -> Self {
        let aggregation_pool = Arc::new(StateEventPool::new(config.event_pool.clone()));
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
            aggregation_pool,
            counters: Counters::default(),
        }
    }

    /// Registry configuration.
    #[must_use]
    pub fn config(&self) -> &StoreQueryConfig {
        &self.config
    }

    /// Pool shared by aggregate-backed runtimes built through
    /// [`runtime_builder`](Self::runtime_builder).
    #[must_use]
    pub fn aggregation_pool(&self) -> &Arc<StateEventPool> {
        &self.aggregation_pool
    }

    /// Starts a runtime builder. Aggregate targets are pre-wired with the
    /// registry's aggregation pool.
    #[must_use]
    pub fn runtime_builder(
        &self,
        kind: StoreQueryKind,
        query_name: impl Into<String>,
        schema: impl Into<Arc<StreamSchema>>,
    ) -> StoreQueryRuntimeBuilder {
        let builder = StoreQueryRuntimeBuilder::new(kind, query_name, schema);
        if builder.event_type() == EventType::Aggregate {
            let pool: Arc<dyn EventSource> = self.aggregation_pool.clone();
            builder.event_pool(pool)
        } else {
            builder
        }
    }

    /// Adds a runtime under its query name, evicting the least recently
    /// used runtime when the registry is full.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::QueryAlreadyExists`] if the name is taken.
    pub fn register(
        &self,
        runtime: impl Into<Arc<dyn StoreQueryRuntime>>,
    ) -> Result<(), StoreQueryError> {
        let runtime = runtime.into();
        let name = runtime.query_name().to_string();
        let mut state = self.state.lock();
        if state.entries.contains_key(&name) {
            return Err(StoreQueryError::QueryAlreadyExists(name));
        }
        while state.entries.len() >= self.config.registry_capacity.max(1) {
            let Some(evicted) = state.evict_lru() else {
                break;
            };
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::info!(query = %evicted, "evicted store query runtime");
        }
        state.clock += 1;
        let last_used = state.clock;
        tracing::info!(query = %name, kind = %runtime.kind(), "registered store query runtime");
        state.entries.insert(name, Entry { runtime, last_used });
        Ok(())
    }

    /// Looks up a runtime, marking it as recently used.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn StoreQueryRuntime>> {
        self.state.lock().touch(name)
    }

    /// Removes a runtime.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn StoreQueryRuntime>> {
        self.state.lock().entries.remove(name).map(|entry| entry.runtime)
    }

    /// Returns `true` if a runtime is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().entries.contains_key(name)
    }

    /// Number of registered runtimes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Names of the registered runtimes, sorted.
    #[must_use]
    pub fn query_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Executes the named query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::QueryNotFound`] for unknown names and
    /// propagates execution errors of the runtime.
    pub fn execute(&self, name: &str) -> Result<Vec<Row>, StoreQueryError> {
        let runtime = self.lookup(name)?;
        let result = runtime.execute();
        self.record(&result, &self.counters.executions);
        result
    }

    /// Resets the named query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::QueryNotFound`] for unknown names and
    /// propagates reset errors of the runtime.
    pub fn reset(&self, name: &str) -> Result<(), StoreQueryError> {
        let runtime = self.lookup(name)?;
        let result = runtime.reset();
        self.record(&result, &self.counters.resets);
        result
    }

    /// Resets every registered query, in name order.
    ///
    /// All runtimes are reset even if some fail.
    ///
    /// # Errors
    ///
    /// Returns the first reset error encountered.
    pub fn reset_all(&self) -> Result<(), StoreQueryError> {
        let mut runtimes: Vec<Arc<dyn StoreQueryRuntime>> = self
            .state
            .lock()
            .entries
            .values()
            .map(|entry| Arc::clone(&entry.runtime))
            .collect();
        runtimes.sort_by(|a, b| a.query_name().cmp(b.query_name()));

        let mut first_error = None;
        for runtime in runtimes {
            let result = runtime.reset();
            self.record(&result, &self.counters.resets);
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Output attributes of the named query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::QueryNotFound`] for unknown names.
    pub fn output_attributes(&self, name: &str) -> Result<Vec<Attribute>, StoreQueryError> {
        Ok(self.lookup(name)?.store_query_output_attributes())
    }

    /// Snapshot of the registry counters.
    #[must_use]
    pub fn metrics(&self) -> RegistryMetrics {
        RegistryMetrics {
            executions: self.counters.executions.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            resets: self.counters.resets.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn StoreQueryRuntime>, StoreQueryError> {
        self.get(name)
            .ok_or_else(|| StoreQueryError::QueryNotFound(name.to_string()))
    }

    fn record<T>(&self, result: &Result<T, StoreQueryError>, success: &AtomicU64) {
        let counter = if result.is_ok() {
            success
        } else {
            &self.counters.failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for StoreQueryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreQueryRegistry")
            .field("config", &self.config)
            .field("queries", &self.len())
            .field("metrics", &self.metrics())
            .finish()
    }
}
