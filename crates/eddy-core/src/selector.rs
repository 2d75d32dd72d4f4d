//! # Query Selector
//!
//! The pipeline stage that filters, projects, aggregates or applies table
//! mutations for a submitted [`EventChunk`]. The same selector serves the
//! continuous path and the on-demand store query path.
//!
//! Selectors work on the chunk in place: a selector may drop events, rewrite
//! their output data, or replace the contents with result events. Chunks
//! whose events are of kind [`Reset`](crate::event::ComplexEventType::Reset)
//! ask the selector to clear transient aggregation state.

use crate::chunk::EventChunk;
use crate::event::EventError;
use crate::table::TableError;

/// Trait implemented by every selector stage.
pub trait QuerySelector: Send + Sync {
    /// Processes a chunk in place.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if the stage or the table behind it fails.
    fn process(&self, chunk: &mut EventChunk) -> Result<(), ProcessError>;
}

/// Errors that can occur while a selector processes a chunk.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Table operation failed
    #[error("Table operation failed: {0}")]
    Table(#[from] TableError),

    /// Event assembly failed
    #[error("Event assembly failed: {0}")]
    Event(#[from] EventError),

    /// Processing error
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}
