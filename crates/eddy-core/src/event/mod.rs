//! # Event Model
//!
//! Events flowing through the selector pipeline.
//!
//! - [`StreamEvent`] - a single row buffer split into three segments
//! - [`StateEvent`] - a fixed-slot composite of row buffers
//! - [`Row`] - an output row returned to store query callers
//! - [`AttributeValue`] - a single field value

mod row;
mod state;
mod stream;
mod value;

pub use row::Row;
pub use state::StateEvent;
pub use stream::StreamEvent;
pub use value::AttributeValue;

/// Kind of a complex event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComplexEventType {
    /// A live event.
    #[default]
    Current,
    /// An event leaving a window.
    Expired,
    /// A timer tick.
    Timer,
    /// A signal to clear transient aggregation state.
    Reset,
}

/// Errors raised while assembling events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// Slot index past the end of a state event.
    #[error("slot {position} out of range for state event with {slots} slots")]
    SlotOutOfRange {
        /// Requested slot.
        position: usize,
        /// Slot count of the event.
        slots: usize,
    },
}
