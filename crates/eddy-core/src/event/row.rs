//! Output rows handed back to store query callers.

use super::state::StateEvent;
use super::value::AttributeValue;
use super::ComplexEventType;

/// A result row produced by a store query.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Event timestamp in milliseconds.
    pub timestamp: i64,
    /// Output values in output-attribute order.
    pub data: Vec<AttributeValue>,
    /// Whether the row represents an expired event.
    pub is_expired: bool,
}

impl Row {
    /// Creates a current (non-expired) row.
    #[must_use]
    pub fn new(timestamp: i64, data: Vec<AttributeValue>) -> Self {
        Self {
            timestamp,
            data,
            is_expired: false,
        }
    }
}

impl From<&StateEvent> for Row {
    fn from(event: &StateEvent) -> Self {
        Self {
            timestamp: event.timestamp(),
            data: event.output_data().to_vec(),
            is_expired: event.event_type() == ComplexEventType::Expired,
        }
    }
}
