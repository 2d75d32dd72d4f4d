//! End-to-end behavior of store query runtimes against stub and real
//! selectors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eddy_core::chunk::{ChunkId, EventChunk};
use eddy_core::event::{AttributeValue, ComplexEventType, StateEvent};
use eddy_core::pool::{
    EventSource, ExhaustionPolicy, PoolConfig, PoolError, PooledEvent, StateEventPool,
};
use eddy_core::schema::{Attribute, AttributeType, Dimensions, EventType, StreamSchema};
use eddy_core::selector::{ProcessError, QuerySelector};
use eddy_core::table::{Condition, InMemoryTable, TableAction, TableSelector};
use eddy_db::{
    ConfigError, ExecutionFailure, StoreQueryConfig, StoreQueryError, StoreQueryKind,
    StoreQueryRegistry, StoreQueryRuntime, StoreQueryRuntimeBuilder,
};
use parking_lot::Mutex;

/// What a selector saw for one submitted chunk.
#[derive(Debug, Clone)]
struct Observed {
    chunk_id: ChunkId,
    len: usize,
    batching: bool,
    event_id: u64,
    event_type: ComplexEventType,
    slot_count: usize,
    output_len: usize,
    base: Option<(Dimensions, ComplexEventType)>,
    aggregate: Option<(Dimensions, ComplexEventType)>,
}

#[derive(Default)]
struct RecordingSelector {
    seen: Mutex<Vec<Observed>>,
}

impl RecordingSelector {
    fn seen(&self) -> Vec<Observed> {
        self.seen.lock().clone()
    }
}

impl QuerySelector for RecordingSelector {
    fn process(&self, chunk: &mut EventChunk) -> Result<(), ProcessError> {
        let first = chunk
            .first()
            .ok_or_else(|| ProcessError::ProcessingFailed("empty chunk".to_string()))?;
        let slot = |position: usize| {
            first
                .stream_event(position)
                .map(|row| (row.dimensions(), row.event_type()))
        };
        self.seen.lock().push(Observed {
            chunk_id: chunk.id(),
            len: chunk.len(),
            batching: chunk.is_batch(),
            event_id: first.id(),
            event_type: first.event_type(),
            slot_count: first.slot_count(),
            output_len: first.output_data().len(),
            base: slot(0),
            aggregate: slot(1),
        });
        Ok(())
    }
}

struct FailingSelector;

impl QuerySelector for FailingSelector {
    fn process(&self, _chunk: &mut EventChunk) -> Result<(), ProcessError> {
        Err(ProcessError::ProcessingFailed("table is read-only".to_string()))
    }
}

/// Lends detached events and remembers their ids.
#[derive(Default)]
struct CountingSource {
    borrows: AtomicUsize,
    lent: Mutex<Vec<u64>>,
}

impl CountingSource {
    fn borrows(&self) -> usize {
        self.borrows.load(Ordering::SeqCst)
    }
}

impl EventSource for CountingSource {
    fn borrow_event(&self) -> Result<PooledEvent, PoolError> {
        self.borrows.fetch_add(1, Ordering::SeqCst);
        let sentinel = StateEvent::new(2, 0);
        self.lent.lock().push(sentinel.id());
        Ok(PooledEvent::detached(sentinel))
    }

    fn slots(&self) -> usize {
        2
    }
}

fn user_attrs() -> Vec<Attribute> {
    vec![
        Attribute::new("id", AttributeType::Int),
        Attribute::new("name", AttributeType::String),
    ]
}

fn user_schema(event_type: EventType) -> StreamSchema {
    StreamSchema::builder(event_type, user_attrs())
        .before_window(user_attrs())
        .on_after_window(user_attrs())
        .output(user_attrs())
        .build()
}

fn users_table() -> Arc<InMemoryTable> {
    let table = InMemoryTable::new("users", user_attrs(), "id").unwrap();
    table
        .insert(vec![AttributeValue::Int(1), AttributeValue::from("ann")])
        .unwrap();
    table
        .insert(vec![AttributeValue::Int(2), AttributeValue::from("bob")])
        .unwrap();
    Arc::new(table)
}

fn delete_runtime(
    event_type: EventType,
    selector: Option<Arc<dyn QuerySelector>>,
    pool: Option<Arc<dyn EventSource>>,
) -> Box<dyn StoreQueryRuntime> {
    let schema = user_schema(event_type);
    let mut builder = StoreQueryRuntimeBuilder::new(StoreQueryKind::Delete, "deleteUsers", schema);
    if let Some(selector) = selector {
        builder = builder.selector(selector);
    }
    if let Some(pool) = pool {
        builder = builder.event_pool(pool);
    }
    builder.build().unwrap()
}

#[test]
fn test_table_delete_forwards_single_request_event() {
    let selector = Arc::new(RecordingSelector::default());
    let runtime = delete_runtime(EventType::Table, Some(selector.clone()), None);

    let rows = runtime.execute().unwrap();
    assert!(rows.is_empty());

    let seen = selector.seen();
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.len, 1);
    assert!(request.batching);
    assert_eq!(request.slot_count, 1);
    assert_eq!(request.output_len, 2);
    assert_eq!(request.event_type, ComplexEventType::Current);
    assert_eq!(request.base, Some(((2, 2, 2), ComplexEventType::Current)));
    assert_eq!(request.aggregate, None);
}

#[test]
fn test_non_table_targets_skip_selector() {
    for event_type in [EventType::Window, EventType::Default] {
        let selector = Arc::new(RecordingSelector::default());
        let runtime = delete_runtime(event_type, Some(selector.clone()), None);
        assert!(runtime.execute().unwrap().is_empty());
        assert!(selector.seen().is_empty());
    }

    let selector = Arc::new(RecordingSelector::default());
    let source = Arc::new(CountingSource::default());
    let runtime = delete_runtime(EventType::Aggregate, Some(selector.clone()), Some(source));
    assert!(runtime.execute().unwrap().is_empty());
    assert!(selector.seen().is_empty());
}

#[test]
fn test_output_attributes_are_fresh_copies() {
    let runtime = delete_runtime(EventType::Table, None, None);
    let mut first = runtime.store_query_output_attributes();
    let second = runtime.store_query_output_attributes();
    assert_eq!(first, second);
    assert_eq!(first, user_attrs());

    first.clear();
    assert_eq!(runtime.store_query_output_attributes(), second);
}

#[test]
fn test_reset_without_selector_is_noop() {
    let source = Arc::new(CountingSource::default());
    let runtime = delete_runtime(EventType::Aggregate, None, Some(source.clone()));

    runtime.reset().unwrap();
    runtime.reset().unwrap();
    assert_eq!(source.borrows(), 0);
}

#[test]
fn test_aggregate_reset_uses_pooled_event_in_second_slot() {
    let selector = Arc::new(RecordingSelector::default());
    let source = Arc::new(CountingSource::default());
    let runtime = delete_runtime(
        EventType::Aggregate,
        Some(selector.clone()),
        Some(source.clone()),
    );

    runtime.reset().unwrap();

    assert_eq!(source.borrows(), 1);
    let sentinel = source.lent.lock()[0];
    let seen = selector.seen();
    assert_eq!(seen.len(), 1);
    let reset = &seen[0];
    assert_eq!(reset.event_id, sentinel);
    assert_eq!(reset.len, 1);
    assert!(!reset.batching);
    assert_eq!(reset.event_type, ComplexEventType::Reset);
    assert_eq!(reset.base, None);
    assert_eq!(reset.aggregate, Some(((2, 2, 2), ComplexEventType::Reset)));
    assert_eq!(reset.output_len, 2);
}

#[test]
fn test_table_reset_uses_first_slot() {
    let selector = Arc::new(RecordingSelector::default());
    let source = Arc::new(CountingSource::default());
    let runtime = delete_runtime(EventType::Table, Some(selector.clone()), Some(source.clone()));

    runtime.reset().unwrap();

    let seen = selector.seen();
    assert_eq!(seen[0].event_id, source.lent.lock()[0]);
    assert_eq!(seen[0].event_type, ComplexEventType::Reset);
    assert_eq!(seen[0].base, Some(((2, 2, 2), ComplexEventType::Reset)));
    assert_eq!(seen[0].aggregate, None);
}

#[test]
fn test_reset_without_pool_uses_owned_event() {
    let selector = Arc::new(RecordingSelector::default());
    let runtime = delete_runtime(EventType::Window, Some(selector.clone()), None);

    runtime.reset().unwrap();

    let seen = selector.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].slot_count, 1);
    assert_eq!(seen[0].output_len, 2);
    assert_eq!(seen[0].base, Some(((2, 2, 2), ComplexEventType::Reset)));
}

#[test]
fn test_reset_chunk_is_not_the_request_chunk() {
    let selector = Arc::new(RecordingSelector::default());
    let runtime = delete_runtime(EventType::Table, Some(selector.clone()), None);

    runtime.execute().unwrap();
    runtime.reset().unwrap();
    runtime.execute().unwrap();

    let seen = selector.seen();
    assert_eq!(seen.len(), 3);
    assert_ne!(seen[0].chunk_id, seen[1].chunk_id);
    assert_ne!(seen[0].chunk_id, seen[2].chunk_id);
    assert_ne!(seen[1].chunk_id, seen[2].chunk_id);
    assert!(seen[0].batching);
    assert!(!seen[1].batching);
}

#[test]
fn test_reset_returns_pooled_event() {
    let selector = Arc::new(RecordingSelector::default());
    let pool = StateEventPool::new(PoolConfig::for_aggregation(2));
    let runtime = delete_runtime(
        EventType::Aggregate,
        Some(selector),
        Some(Arc::new(pool.clone())),
    );

    let before = pool.stats();
    runtime.reset().unwrap();
    runtime.reset().unwrap();
    let after = pool.stats();

    assert_eq!(after.in_use, 0);
    assert_eq!(after.allocated, before.allocated);
    assert_eq!(after.borrows, before.borrows + 2);
}

#[test]
fn test_selector_failure_names_query() {
    let runtime = delete_runtime(EventType::Table, Some(Arc::new(FailingSelector)), None);

    let err = runtime.execute().unwrap_err();
    assert_eq!(err.query_name(), Some("deleteUsers"));
    assert_eq!(
        err.to_string(),
        "Error executing 'deleteUsers', Processing failed: table is read-only"
    );
    assert!(matches!(
        err,
        StoreQueryError::Execution {
            source: ExecutionFailure::Selector(_),
            ..
        }
    ));
}

#[test]
fn test_table_execute_without_selector_fails() {
    let runtime = delete_runtime(EventType::Table, None, None);
    let err = runtime.execute().unwrap_err();
    assert!(matches!(
        err,
        StoreQueryError::Execution {
            source: ExecutionFailure::SelectorNotBound,
            ..
        }
    ));
}

#[test]
fn test_exhausted_pool_surfaces_as_execution_error() {
    let pool = StateEventPool::new(
        PoolConfig::builder()
            .max_size(1)
            .slots(2)
            .exhaustion(ExhaustionPolicy::Reject)
            .build(),
    );
    let runtime = delete_runtime(
        EventType::Aggregate,
        Some(Arc::new(RecordingSelector::default())),
        Some(Arc::new(pool.clone())),
    );

    let held = pool.borrow().unwrap();
    let err = runtime.reset().unwrap_err();
    assert!(matches!(
        err,
        StoreQueryError::Execution {
            source: ExecutionFailure::Pool(PoolError::Exhausted { capacity: 1 }),
            ..
        }
    ));

    drop(held);
    runtime.reset().unwrap();
}

#[test]
fn test_delete_against_table_is_idempotent() {
    let table = users_table();
    let selector = Arc::new(TableSelector::new(
        Arc::clone(&table),
        TableAction::Delete {
            condition: Condition::equals(0, 1),
        },
    ));
    let runtime = delete_runtime(EventType::Table, Some(selector), None);
    assert_eq!(runtime.store_query_output_attributes(), user_attrs());

    assert!(runtime.execute().unwrap().is_empty());
    assert_eq!(table.len(), 1);
    assert!(runtime.execute().unwrap().is_empty());
    assert_eq!(table.len(), 1);
    assert_eq!(runtime.store_query_output_attributes(), user_attrs());
    assert_eq!(
        table.find(&Condition::All),
        vec![vec![AttributeValue::Int(2), AttributeValue::from("bob")]]
    );
}

#[test]
fn test_mutation_variants_against_table() {
    let table = users_table();
    let build = |kind: StoreQueryKind, name: &str, action: TableAction| {
        StoreQueryRuntimeBuilder::new(kind, name, user_schema(EventType::Table))
            .selector(Arc::new(TableSelector::new(Arc::clone(&table), action)))
            .build()
            .unwrap()
    };

    let insert = build(
        StoreQueryKind::Insert,
        "insertCat",
        TableAction::Insert {
            values: vec![AttributeValue::Int(3), AttributeValue::from("cat")],
        },
    );
    let update = build(
        StoreQueryKind::Update,
        "renameBob",
        TableAction::Update {
            condition: Condition::equals(0, 2),
            set: vec![(1, AttributeValue::from("robert"))],
        },
    );
    let upsert = build(
        StoreQueryKind::UpdateOrInsert,
        "upsertDan",
        TableAction::UpdateOrInsert {
            condition: Condition::equals(0, 4),
            set: vec![(1, AttributeValue::from("daniel"))],
            values: vec![AttributeValue::Int(4), AttributeValue::from("dan")],
        },
    );
    let find = build(
        StoreQueryKind::Find,
        "findAll",
        TableAction::Find {
            condition: Condition::All,
        },
    );

    assert!(insert.execute().unwrap().is_empty());
    assert!(update.execute().unwrap().is_empty());
    assert!(upsert.execute().unwrap().is_empty());
    assert!(upsert.execute().unwrap().is_empty());

    let mut names: Vec<AttributeValue> = find
        .execute()
        .unwrap()
        .into_iter()
        .map(|row| row.data[1].clone())
        .collect();
    names.sort_by_key(|name| format!("{name:?}"));
    assert_eq!(
        names,
        vec![
            AttributeValue::from("ann"),
            AttributeValue::from("cat"),
            AttributeValue::from("daniel"),
            AttributeValue::from("robert"),
        ]
    );

    // Duplicate key surfaces as an execution error naming the query.
    let err = insert.execute().unwrap_err();
    assert_eq!(err.query_name(), Some("insertCat"));
}

#[test]
fn test_concurrent_execution_shares_runtime() {
    let selector = Arc::new(RecordingSelector::default());
    let runtime: Arc<dyn StoreQueryRuntime> =
        Arc::from(delete_runtime(EventType::Table, Some(selector.clone()), None));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let runtime = Arc::clone(&runtime);
            scope.spawn(move || {
                for _ in 0..25 {
                    runtime.execute().unwrap();
                }
            });
        }
    });

    let seen = selector.seen();
    assert_eq!(seen.len(), 100);
    assert!(seen.iter().all(|observed| observed.len == 1));
}

#[test]
fn test_registry_drives_registered_runtimes() {
    let registry = StoreQueryRegistry::new(StoreQueryConfig::default());
    let selector = Arc::new(RecordingSelector::default());

    let aggregate = registry
        .runtime_builder(StoreQueryKind::Find, "totals", user_schema(EventType::Aggregate))
        .selector(selector.clone())
        .build()
        .unwrap();
    registry.register(aggregate).unwrap();
    let failing = registry
        .runtime_builder(StoreQueryKind::Delete, "broken", user_schema(EventType::Table))
        .selector(Arc::new(FailingSelector))
        .build()
        .unwrap();
    registry.register(failing).unwrap();

    assert!(registry.execute("totals").unwrap().is_empty());
    assert!(registry.execute("broken").is_err());
    registry.reset("totals").unwrap();
    assert!(registry.reset_all().is_err());

    let metrics = registry.metrics();
    assert_eq!(metrics.executions, 1);
    assert_eq!(metrics.failures, 2);
    assert_eq!(metrics.resets, 2);
    assert_eq!(registry.aggregation_pool().stats().in_use, 0);

    let resets: Vec<_> = selector
        .seen()
        .into_iter()
        .filter(|observed| observed.event_type == ComplexEventType::Reset)
        .collect();
    assert_eq!(resets.len(), 2);
    assert!(resets.iter().all(|observed| observed.aggregate.is_some()));
}

#[test]
fn test_registry_pool_output_matches_query_outputs() {
    // The default aggregation pool lends events with an empty output array.
    let registry = StoreQueryRegistry::new(StoreQueryConfig::default());
    let selector = Arc::new(RecordingSelector::default());
    let runtime = registry
        .runtime_builder(StoreQueryKind::Delete, "purgeTotals", user_schema(EventType::Aggregate))
        .selector(selector.clone())
        .build()
        .unwrap();

    runtime.reset().unwrap();
    runtime.reset().unwrap();

    let seen = selector.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|observed| observed.output_len == 2));
    assert_eq!(registry.aggregation_pool().stats().in_use, 0);
}

#[test]
fn test_registry_rejects_single_slot_aggregation_pool() {
    let config = StoreQueryConfig::default().with_event_pool(PoolConfig::default());
    let registry = StoreQueryRegistry::new(config);

    let err = registry
        .runtime_builder(StoreQueryKind::Find, "totals", user_schema(EventType::Aggregate))
        .selector(Arc::new(RecordingSelector::default()))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        StoreQueryError::Config(ConfigError::InsufficientPoolSlots { .. })
    ));
    assert_eq!(err.query_name(), Some("totals"));

    // Non-aggregate targets are not wired to the aggregation pool.
    assert!(registry
        .runtime_builder(StoreQueryKind::Find, "users", user_schema(EventType::Table))
        .build()
        .is_ok());
}
