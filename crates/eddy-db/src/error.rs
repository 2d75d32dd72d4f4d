//! Error types for store query runtimes.

use eddy_core::event::EventError;
use eddy_core::pool::PoolError;
use eddy_core::selector::ProcessError;

/// Errors from store query construction and execution.
#[derive(Debug, thiserror::Error)]
pub enum StoreQueryError {
    /// Execution or reset failed. Carries the query name and the original
    /// cause.
    #[error("Error executing '{query}', {source}")]
    Execution {
        /// Name of the failing query.
        query: String,
        /// What went wrong.
        #[source]
        source: ExecutionFailure,
    },

    /// Runtime wiring rejected at build time
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Query not found
    #[error("Store query '{0}' not found")]
    QueryNotFound(String),

    /// Query already exists
    #[error("Store query '{0}' already exists")]
    QueryAlreadyExists(String),
}

impl StoreQueryError {
    pub(crate) fn execution(query: &str, source: impl Into<ExecutionFailure>) -> Self {
        Self::Execution {
            query: query.to_string(),
            source: source.into(),
        }
    }

    /// Name of the query the error is attributed to, if any.
    #[must_use]
    pub fn query_name(&self) -> Option<&str> {
        match self {
            Self::Execution { query, .. } => Some(query.as_str()),
            Self::Config(err) => err.query_name(),
            Self::QueryNotFound(name) | Self::QueryAlreadyExists(name) => Some(name.as_str()),
        }
    }
}

/// Underlying cause of a failed `execute()` or `reset()`.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionFailure {
    /// A table query ran without a selector.
    #[error("no selector bound")]
    SelectorNotBound,

    /// The selector, or the table behind it, failed.
    #[error(transparent)]
    Selector(#[from] ProcessError),

    /// The event pool could not lend an event.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The request event could not be assembled.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Wiring errors detected when a runtime is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Aggregate-backed runtime without an event pool.
    #[error("store query '{query}' targets an aggregation but no event pool is bound")]
    MissingEventPool {
        /// Query name.
        query: String,
    },

    /// Event pool lends events with too few slots for the target.
    #[error("store query '{query}' needs {required} event slots, pool provides {slots}")]
    InsufficientPoolSlots {
        /// Query name.
        query: String,
        /// Slots the target needs.
        required: usize,
        /// Slots of the pool's events.
        slots: usize,
    },

    /// No output attributes and an empty input definition.
    #[error("store query '{query}' has no output attributes")]
    EmptyOutputAttributes {
        /// Query name.
        query: String,
    },

    /// Query name is empty.
    #[error("store query name must not be empty")]
    EmptyQueryName,
}

impl ConfigError {
    fn query_name(&self) -> Option<&str> {
        match self {
            Self::MissingEventPool { query }
            | Self::InsufficientPoolSlots { query, .. }
            | Self::EmptyOutputAttributes { query } => Some(query.as_str()),
            Self::EmptyQueryName => None,
        }
    }
}
