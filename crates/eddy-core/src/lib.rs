//! # `EddyDB` Core
//!
//! Event model and pipeline plumbing shared by continuous queries and
//! on-demand store queries.
//!
//! This crate provides:
//! - **Schema**: attribute and three-part stream layout descriptors
//! - **Events**: row buffers, composite state events and output rows
//! - **Pool**: a thread-safe pool of reusable state events
//! - **Chunks**: the batch unit submitted into a selector
//! - **Selector**: the processing contract of the selector stage
//! - **Table**: an in-memory table and a selector that mutates it
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use eddy_core::chunk::EventChunk;
//! use eddy_core::event::{AttributeValue, StateEvent};
//! use eddy_core::schema::{Attribute, AttributeType};
//! use eddy_core::selector::QuerySelector;
//! use eddy_core::table::{Condition, InMemoryTable, TableAction, TableSelector};
//!
//! let table = Arc::new(InMemoryTable::new(
//!     "users",
//!     vec![
//!         Attribute::new("id", AttributeType::Int),
//!         Attribute::new("name", AttributeType::String),
//!     ],
//!     "id",
//! )?);
//! table.insert(vec![AttributeValue::Int(1), AttributeValue::from("ann")])?;
//!
//! let selector = TableSelector::new(
//!     Arc::clone(&table),
//!     TableAction::Delete { condition: Condition::equals(0, 1) },
//! );
//! selector.process(&mut EventChunk::single(StateEvent::new(1, 0), true))?;
//! assert!(table.is_empty());
//! # Ok::<(), eddy_core::Error>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chunk;
pub mod event;
pub mod pool;
pub mod schema;
pub mod selector;
pub mod table;

// Re-export key types
pub use chunk::{ChunkEvent, ChunkId, EventChunk};
pub use event::{AttributeValue, ComplexEventType, Row, StateEvent, StreamEvent};
pub use pool::{EventSource, PoolConfig, PooledEvent, StateEventPool};
pub use schema::{Attribute, AttributeType, EventType, StreamSchema};
pub use selector::QuerySelector;

/// Result type for eddy-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for eddy-core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Event assembly errors
    #[error("Event error: {0}")]
    Event(#[from] event::EventError),

    /// Event pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] pool::PoolError),

    /// Selector errors
    #[error("Selector error: {0}")]
    Selector(#[from] selector::ProcessError),

    /// Table errors
    #[error("Table error: {0}")]
    Table(#[from] table::TableError),
}
