//! # Store Query Runtimes
//!
//! One runtime per compiled ad-hoc query. Every variant drives a synthetic
//! single-event chunk through the same selector the continuous pipeline
//! uses:
//!
//! - `execute()` builds a one-slot request event sized to the schema and,
//!   for table targets only, hands it to the selector
//! - `reset()` sends a RESET-typed chunk so downstream aggregation state can
//!   clear itself
//!
//! Variants differ only in the table operation their selector performs and
//! in whether selector output is surfaced as rows ([`FindStoreQueryRuntime`]).
//!
//! Runtimes are immutable once built; see
//! [`StoreQueryRuntimeBuilder`](crate::StoreQueryRuntimeBuilder).

mod find;
mod mutation;

pub use find::FindStoreQueryRuntime;
pub use mutation::{
    DeleteStoreQueryRuntime, InsertStoreQueryRuntime, UpdateOrInsertStoreQueryRuntime,
    UpdateStoreQueryRuntime,
};

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use eddy_core::chunk::{ChunkEvent, EventChunk};
use eddy_core::event::{AttributeValue, ComplexEventType, Row, StateEvent, StreamEvent};
use eddy_core::pool::EventSource;
use eddy_core::schema::{Attribute, EventType, StreamSchema};
use eddy_core::selector::QuerySelector;

use crate::error::{ExecutionFailure, StoreQueryError};

/// Slot of the base row in a request event.
pub const BASE_SLOT: usize = 0;

/// Slot of the row buffer in an aggregate-backed reset event.
pub const AGGREGATE_SLOT: usize = 1;

/// Kind of store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreQueryKind {
    /// `insert into`
    Insert,
    /// `delete`
    Delete,
    /// `update`
    Update,
    /// `update or insert into`
    UpdateOrInsert,
    /// `from ... select`
    Find,
}

impl fmt::Display for StoreQueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::UpdateOrInsert => "update-or-insert",
            Self::Find => "find",
        };
        f.write_str(name)
    }
}

/// Contract shared by every store query runtime.
pub trait StoreQueryRuntime: Send + Sync + fmt::Debug {
    /// Diagnostic name of the query.
    fn query_name(&self) -> &str;

    /// Which variant this is.
    fn kind(&self) -> StoreQueryKind;

    /// Target type of the query.
    fn event_type(&self) -> EventType;

    /// Runs the query once.
    ///
    /// Mutation variants return an empty sequence; [`StoreQueryKind::Find`]
    /// returns the rows produced by the selector. Targets other than
    /// [`EventType::Table`] return an empty sequence without touching the
    /// selector.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::Execution`] with the query name and the
    /// original cause if anything fails. Nothing is retried or rolled back.
    fn execute(&self) -> Result<Vec<Row>, StoreQueryError>;

    /// Sends a reset signal through the selector.
    ///
    /// A runtime without a selector does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreQueryError::Execution`] if the pool cannot lend an
    /// event or the selector fails.
    fn reset(&self) -> Result<(), StoreQueryError>;

    /// Output attributes of the query, freshly copied on every call.
    fn store_query_output_attributes(&self) -> Vec<Attribute>;
}

/// Wiring shared by all variants. Immutable after construction.
pub(crate) struct RuntimeBinding {
    query_name: String,
    schema: Arc<StreamSchema>,
    selector: Option<Arc<dyn QuerySelector>>,
    event_pool: Option<Arc<dyn EventSource>>,
    output_attributes: Arc<[Attribute]>,
}

impl RuntimeBinding {
    pub(crate) fn new(
        query_name: String,
        schema: Arc<StreamSchema>,
        selector: Option<Arc<dyn QuerySelector>>,
        event_pool: Option<Arc<dyn EventSource>>,
        output_attributes: Arc<[Attribute]>,
    ) -> Self {
        Self {
            query_name,
            schema,
            selector,
            event_pool,
            output_attributes,
        }
    }

    pub(crate) fn query_name(&self) -> &str {
        &self.query_name
    }

    pub(crate) fn event_type(&self) -> EventType {
        self.schema.event_type()
    }

    pub(crate) fn output_attributes(&self) -> Vec<Attribute> {
        self.output_attributes.to_vec()
    }

    /// Runs the request through the selector and turns the processed chunk
    /// into rows with `collect`.
    pub(crate) fn execute<F>(
        &self,
        kind: StoreQueryKind,
        collect: F,
    ) -> Result<Vec<Row>, StoreQueryError>
    where
        F: FnOnce(&EventChunk) -> Vec<Row>,
    {
        tracing::debug!(
            query = %self.query_name,
            %kind,
            event_type = ?self.event_type(),
            "executing store query"
        );
        self.try_execute(collect).map_err(|cause| self.fail("execute", cause))
    }

    fn try_execute<F>(&self, collect: F) -> Result<Vec<Row>, ExecutionFailure>
    where
        F: FnOnce(&EventChunk) -> Vec<Row>,
    {
        let mut chunk = self.request_chunk()?;
        if self.event_type() != EventType::Table {
            return Ok(Vec::new());
        }
        let selector = self
            .selector
            .as_ref()
            .ok_or(ExecutionFailure::SelectorNotBound)?;
        selector.process(&mut chunk)?;
        Ok(collect(&chunk))
    }

    pub(crate) fn reset(&self) -> Result<(), StoreQueryError> {
        let Some(selector) = &self.selector else {
            return Ok(());
        };
        tracing::debug!(query = %self.query_name, "resetting store query");
        self.reset_chunk()
            .and_then(|mut chunk| selector.process(&mut chunk).map_err(ExecutionFailure::from))
            .map_err(|cause| self.fail("reset", cause))
    }

    /// One-slot, batching chunk carrying an empty row for the schema.
    fn request_chunk(&self) -> Result<EventChunk, ExecutionFailure> {
        let mut event = StateEvent::new(1, self.output_attributes.len());
        event.set_timestamp(now_millis());
        event.add_event(BASE_SLOT, StreamEvent::for_schema(&self.schema))?;
        Ok(EventChunk::single(event, true))
    }

    /// Fresh non-batching chunk carrying a RESET event. The row buffer sits
    /// at [`AGGREGATE_SLOT`] for aggregations and [`BASE_SLOT`] otherwise.
    /// The event's output array is sized to the output attributes whether
    /// it comes from the pool or not.
    fn reset_chunk(&self) -> Result<EventChunk, ExecutionFailure> {
        let mut row = StreamEvent::for_schema(&self.schema);
        row.set_event_type(ComplexEventType::Reset);

        let (slot, slots) = if self.event_type() == EventType::Aggregate {
            (AGGREGATE_SLOT, 2)
        } else {
            (BASE_SLOT, 1)
        };
        let output_size = self.output_attributes.len();
        let mut event = match &self.event_pool {
            Some(pool) => ChunkEvent::Pooled(pool.borrow_event()?),
            None => ChunkEvent::Owned(StateEvent::new(slots, output_size)),
        };
        if event.output_data().len() != output_size {
            event.set_output_data(vec![AttributeValue::Null; output_size]);
        }
        event.add_event(slot, row)?;
        event.set_event_type(ComplexEventType::Reset);

        let mut chunk = EventChunk::new(false);
        chunk.add(event);
        Ok(chunk)
    }

    fn fail(&self, operation: &'static str, cause: ExecutionFailure) -> StoreQueryError {
        tracing::warn!(query = %self.query_name, operation, error = %cause, "store query failed");
        StoreQueryError::execution(&self.query_name, cause)
    }
}

impl fmt::Debug for RuntimeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBinding")
            .field("query_name", &self.query_name)
            .field("event_type", &self.event_type())
            .field("selector_bound", &self.selector.is_some())
            .field("event_pool_bound", &self.event_pool.is_some())
            .field("output_attributes", &self.output_attributes)
            .finish()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
