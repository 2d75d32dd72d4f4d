//! Row buffer for a single stream position.

use super::value::AttributeValue;
use super::ComplexEventType;
use crate::schema::{Dimensions, StreamSchema};

/// Storage for one row, split into before-window, on-after-window and output
/// segments.
///
/// Each segment is sized exactly to the matching attribute list of the
/// schema the event was built for and starts out filled with nulls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamEvent {
    timestamp: i64,
    event_type: ComplexEventType,
    before_window_data: Vec<AttributeValue>,
    on_after_window_data: Vec<AttributeValue>,
    output_data: Vec<AttributeValue>,
}

impl StreamEvent {
    /// Creates a row buffer with the given segment sizes.
    #[must_use]
    pub fn new(before_window: usize, on_after_window: usize, output: usize) -> Self {
        Self {
            timestamp: 0,
            event_type: ComplexEventType::Current,
            before_window_data: vec![AttributeValue::Null; before_window],
            on_after_window_data: vec![AttributeValue::Null; on_after_window],
            output_data: vec![AttributeValue::Null; output],
        }
    }

    /// Creates a row buffer dimensioned by `schema`.
    #[must_use]
    pub fn for_schema(schema: &StreamSchema) -> Self {
        let (before, after, output) = schema.dimensions();
        Self::new(before, after, output)
    }

    /// Segment lengths.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        (
            self.before_window_data.len(),
            self.on_after_window_data.len(),
            self.output_data.len(),
        )
    }

    /// Event timestamp in milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Sets the event timestamp.
    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    /// Event kind.
    #[must_use]
    pub fn event_type(&self) -> ComplexEventType {
        self.event_type
    }

    /// Sets the event kind.
    pub fn set_event_type(&mut self, event_type: ComplexEventType) {
        self.event_type = event_type;
    }

    /// Before-window values.
    #[must_use]
    pub fn before_window_data(&self) -> &[AttributeValue] {
        &self.before_window_data
    }

    /// Mutable before-window values.
    pub fn before_window_data_mut(&mut self) -> &mut [AttributeValue] {
        &mut self.before_window_data
    }

    /// On-after-window values.
    #[must_use]
    pub fn on_after_window_data(&self) -> &[AttributeValue] {
        &self.on_after_window_data
    }

    /// Mutable on-after-window values.
    pub fn on_after_window_data_mut(&mut self) -> &mut [AttributeValue] {
        &mut self.on_after_window_data
    }

    /// Output values.
    #[must_use]
    pub fn output_data(&self) -> &[AttributeValue] {
        &self.output_data
    }

    /// Mutable output values.
    pub fn output_data_mut(&mut self) -> &mut [AttributeValue] {
        &mut self.output_data
    }
}
