//! # `EddyDB` Store Queries
//!
//! On-demand (ad-hoc) queries against tables and aggregations.
//!
//! A store query is compiled once into a [`StoreQueryRuntime`] and then
//! executed on request. Execution assembles a synthetic request event,
//! wraps it in a single-event chunk and pushes it through the same
//! [`QuerySelector`](eddy_core::selector::QuerySelector) that continuous
//! queries use.
//!
//! ## Components
//!
//! - [`StoreQueryRuntimeBuilder`]: validated wiring of one runtime
//! - [`StoreQueryRuntime`]: insert, delete, update, update-or-insert and find
//! - [`StoreQueryRegistry`]: bounded, named cache of built runtimes
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use eddy_core::event::AttributeValue;
//! use eddy_core::schema::{Attribute, AttributeType, EventType, StreamSchema};
//! use eddy_core::table::{Condition, InMemoryTable, TableAction, TableSelector};
//! use eddy_db::{StoreQueryKind, StoreQueryRuntime, StoreQueryRuntimeBuilder};
//!
//! let attrs = vec![
//!     Attribute::new("id", AttributeType::Int),
//!     Attribute::new("name", AttributeType::String),
//! ];
//! let table = Arc::new(InMemoryTable::new("users", attrs.clone(), "id")?);
//! table.insert(vec![AttributeValue::Int(7), AttributeValue::from("ann")])?;
//!
//! let delete = StoreQueryRuntimeBuilder::new(
//!     StoreQueryKind::Delete,
//!     "deleteAnn",
//!     StreamSchema::new(EventType::Table, attrs),
//! )
//! .selector(Arc::new(TableSelector::new(
//!     Arc::clone(&table),
//!     TableAction::Delete { condition: Condition::equals(0, 7) },
//! )))
//! .build()?;
//!
//! assert!(delete.execute()?.is_empty());
//! assert!(table.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod config;
pub mod error;
pub mod registry;
pub mod runtime;

pub use builder::StoreQueryRuntimeBuilder;
pub use config::{StoreQueryConfig, DEFAULT_REGISTRY_CAPACITY};
pub use error::{ConfigError, ExecutionFailure, StoreQueryError};
pub use registry::{RegistryMetrics, StoreQueryRegistry};
pub use runtime::{
    DeleteStoreQueryRuntime, FindStoreQueryRuntime, InsertStoreQueryRuntime, StoreQueryKind,
    StoreQueryRuntime, UpdateOrInsertStoreQueryRuntime, UpdateStoreQueryRuntime, AGGREGATE_SLOT,
    BASE_SLOT,
};

/// Result type for store query operations
pub type Result<T> = std::result::Result<T, StoreQueryError>;
