//! Fluent builder for store query runtimes.

use std::fmt;
use std::sync::Arc;

use eddy_core::pool::EventSource;
use eddy_core::schema::{Attribute, EventType, StreamSchema};
use eddy_core::selector::QuerySelector;

use crate::error::{ConfigError, StoreQueryError};
use crate::runtime::{
    DeleteStoreQueryRuntime, FindStoreQueryRuntime, InsertStoreQueryRuntime, RuntimeBinding,
    StoreQueryKind, StoreQueryRuntime, UpdateOrInsertStoreQueryRuntime, UpdateStoreQueryRuntime,
    AGGREGATE_SLOT, BASE_SLOT,
};

/// Fluent builder producing a fully wired, immutable store query runtime.
///
/// The selector is optional: a runtime without one treats `reset()` as a
/// no-op and fails `execute()` on table targets. An event pool is required
/// for [`EventType::Aggregate`] targets and optional otherwise.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use eddy_core::schema::{Attribute, AttributeType, EventType, StreamSchema};
/// use eddy_core::table::{Condition, InMemoryTable, TableAction, TableSelector};
/// use eddy_db::{StoreQueryKind, StoreQueryRuntime, StoreQueryRuntimeBuilder};
///
/// let attrs = vec![Attribute::new("id", AttributeType::Int)];
/// let table = Arc::new(InMemoryTable::new("ids", attrs.clone(), "id").unwrap());
/// let schema = StreamSchema::new(EventType::Table, attrs);
///
/// let runtime = StoreQueryRuntimeBuilder::new(StoreQueryKind::Delete, "purge", schema)
///     .selector(Arc::new(TableSelector::new(
///         table,
///         TableAction::Delete { condition: Condition::All },
///     )))
///     .build()
///     .unwrap();
///
/// assert!(runtime.execute().unwrap().is_empty());
/// ```
pub struct StoreQueryRuntimeBuilder {
    kind: StoreQueryKind,
    query_name: String,
    schema: Arc<StreamSchema>,
    selector: Option<Arc<dyn QuerySelector>>,
    event_pool: Option<Arc<dyn EventSource>>,
    output_attributes: Option<Vec<Attribute>>,
}

impl StoreQueryRuntimeBuilder {
    /// Starts a builder for a query of `kind` over `schema`.
    #[must_use]
    pub fn new(
        kind: StoreQueryKind,
        query_name: impl Into<String>,
        schema: impl Into<Arc<StreamSchema>>,
    ) -> Self {
        Self {
            kind,
            query_name: query_name.into(),
            schema: schema.into(),
            selector: None,
            event_pool: None,
            output_attributes: None,
        }
    }

    /// Binds the selector the request is forwarded to.
    #[must_use]
    pub fn selector(mut self, selector: Arc<dyn QuerySelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Binds the event pool used by `reset()`.
    #[must_use]
    pub fn event_pool(mut self, pool: Arc<dyn EventSource>) -> Self {
        self.event_pool = Some(pool);
        self
    }

    /// Overrides the output attributes. Defaults to the schema's last input
    /// definition. The list is copied; later changes by the caller do not
    /// reach the runtime.
    #[must_use]
    pub fn output_attributes(mut self, attributes: &[Attribute]) -> Self {
        self.output_attributes = Some(attributes.to_vec());
        self
    }

    /// Kind of runtime this builder produces.
    #[must_use]
    pub fn kind(&self) -> StoreQueryKind {
        self.kind
    }

    /// Target type of the schema.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.schema.event_type()
    }

    /// Builds the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::Config`] if the query name is empty, the
    /// output attribute list is empty, an aggregate target has no event
    /// pool, or the bound pool lends events without the slot the reset
    /// row needs.
    pub fn build(self) -> Result<Box<dyn StoreQueryRuntime>, StoreQueryError> {
        let kind = self.kind;
        let binding = self.into_binding()?;
        tracing::debug!(query = binding.query_name(), %kind, "built store query runtime");
        Ok(match kind {
            StoreQueryKind::Insert => Box::new(InsertStoreQueryRuntime::new(binding)),
            StoreQueryKind::Delete => Box::new(DeleteStoreQueryRuntime::new(binding)),
            StoreQueryKind::Update => Box::new(UpdateStoreQueryRuntime::new(binding)),
            StoreQueryKind::UpdateOrInsert => {
                Box::new(UpdateOrInsertStoreQueryRuntime::new(binding))
            }
            StoreQueryKind::Find => Box::new(FindStoreQueryRuntime::new(binding)),
        })
    }

    fn into_binding(self) -> Result<RuntimeBinding, ConfigError> {
        if self.query_name.is_empty() {
            return Err(ConfigError::EmptyQueryName);
        }
        let required = if self.schema.event_type() == EventType::Aggregate {
            AGGREGATE_SLOT + 1
        } else {
            BASE_SLOT + 1
        };
        match &self.event_pool {
            None if self.schema.event_type() == EventType::Aggregate => {
                return Err(ConfigError::MissingEventPool {
                    query: self.query_name,
                });
            }
            Some(pool) if pool.slots() < required => {
                return Err(ConfigError::InsufficientPoolSlots {
                    query: self.query_name,
                    required,
                    slots: pool.slots(),
                });
            }
            _ => {}
        }
        let output_attributes: Arc<[Attribute]> = match self.output_attributes {
            Some(attributes) => attributes.into(),
            None => self.schema.last_input_definition().into(),
        };
        if output_attributes.is_empty() {
            return Err(ConfigError::EmptyOutputAttributes {
                query: self.query_name,
            });
        }
        Ok(RuntimeBinding::new(
            self.query_name,
            self.schema,
            self.selector,
            self.event_pool,
            output_attributes,
        ))
    }
}

impl fmt::Debug for StoreQueryRuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreQueryRuntimeBuilder")
            .field("kind", &self.kind)
            .field("query_name", &self.query_name)
            .field("event_type", &self.schema.event_type())
            .field("selector_bound", &self.selector.is_some())
            .field("event_pool_bound", &self.event_pool.is_some())
            .field("output_attributes", &self.output_attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::pool::{PoolConfig, StateEventPool};
    use eddy_core::schema::AttributeType;

    fn attrs() -> Vec<Attribute> {
        vec![
            Attribute::new("symbol", AttributeType::String),
            Attribute::new("total", AttributeType::Long),
        ]
    }

    #[test]
    fn test_aggregate_without_pool_is_rejected() {
        let schema = StreamSchema::new(EventType::Aggregate, attrs());
        let err = StoreQueryRuntimeBuilder::new(StoreQueryKind::Find, "agg", schema)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            StoreQueryError::Config(ConfigError::MissingEventPool { .. })
        ));
    }

    #[test]
    fn test_aggregate_with_pool_builds() {
        let schema = StreamSchema::new(EventType::Aggregate, attrs());
        let pool = Arc::new(StateEventPool::new(PoolConfig::for_aggregation(2)));
        let runtime = StoreQueryRuntimeBuilder::new(StoreQueryKind::Find, "agg", schema)
            .event_pool(pool)
            .build()
            .unwrap();
        assert_eq!(runtime.kind(), StoreQueryKind::Find);
        assert_eq!(runtime.event_type(), EventType::Aggregate);
    }

    #[test]
    fn test_aggregate_with_single_slot_pool_is_rejected() {
        let schema = StreamSchema::new(EventType::Aggregate, attrs());
        let pool = Arc::new(StateEventPool::new(PoolConfig::default()));
        let err = StoreQueryRuntimeBuilder::new(StoreQueryKind::Find, "agg", schema)
            .event_pool(pool)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            StoreQueryError::Config(ConfigError::InsufficientPoolSlots {
                required: 2,
                slots: 1,
                ..
            })
        ));
        assert_eq!(err.query_name(), Some("agg"));
    }

    #[test]
    fn test_table_with_single_slot_pool_builds() {
        let schema = StreamSchema::new(EventType::Table, attrs());
        let pool = Arc::new(StateEventPool::new(PoolConfig::default()));
        let runtime = StoreQueryRuntimeBuilder::new(StoreQueryKind::Delete, "q", schema)
            .event_pool(pool)
            .build()
            .unwrap();
        runtime.reset().unwrap();
    }

    #[test]
    fn test_empty_outputs_rejected() {
        let schema = StreamSchema::new(EventType::Table, Vec::new());
        let err = StoreQueryRuntimeBuilder::new(StoreQueryKind::Delete, "q", schema)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            StoreQueryError::Config(ConfigError::EmptyOutputAttributes { .. })
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let schema = StreamSchema::new(EventType::Table, attrs());
        let err = StoreQueryRuntimeBuilder::new(StoreQueryKind::Insert, "", schema)
            .build()
            .unwrap_err();
        assert!(matches!(err, StoreQueryError::Config(ConfigError::EmptyQueryName)));
    }

    #[test]
    fn test_output_attributes_are_copied() {
        let mut source = attrs();
        let schema = StreamSchema::new(EventType::Table, attrs());
        let runtime = StoreQueryRuntimeBuilder::new(StoreQueryKind::Update, "q", schema)
            .output_attributes(&source[..1])
            .build()
            .unwrap();

        source[0] = Attribute::new("changed", AttributeType::Bool);
        let outputs = runtime.store_query_output_attributes();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name(), "symbol");
    }

    #[test]
    fn test_every_kind_builds_matching_variant() {
        for kind in [
            StoreQueryKind::Insert,
            StoreQueryKind::Delete,
            StoreQueryKind::Update,
            StoreQueryKind::UpdateOrInsert,
            StoreQueryKind::Find,
        ] {
            let schema = StreamSchema::new(EventType::Table, attrs());
            let runtime = StoreQueryRuntimeBuilder::new(kind, "q", schema)
                .build()
                .unwrap();
            assert_eq!(runtime.kind(), kind);
            assert_eq!(runtime.query_name(), "q");
        }
    }
}
