//! Composite events correlating row buffers across stream positions.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::stream::StreamEvent;
use super::value::AttributeValue;
use super::{ComplexEventType, EventError};

static NEXT_STATE_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Fixed-slot container of row buffers.
///
/// Slot 0 holds the base row of a request. Aggregate-backed queries use
/// slot 1. The slot count is fixed at construction; [`StateEvent::reset`]
/// empties the slots without changing their number.
///
/// Every instance gets a process-unique [`id`](StateEvent::id) which
/// survives resets, so a pooled instance keeps its identity across borrows.
#[derive(Debug)]
pub struct StateEvent {
    id: u64,
    timestamp: i64,
    event_type: ComplexEventType,
    stream_events: SmallVec<[Option<StreamEvent>; 2]>,
    output_data: Vec<AttributeValue>,
}

impl StateEvent {
    /// Creates a state event with `slots` empty positions and an output
    /// array of `output_size` nulls.
    #[must_use]
    pub fn new(slots: usize, output_size: usize) -> Self {
        let mut stream_events = SmallVec::with_capacity(slots);
        stream_events.resize_with(slots, || None);
        Self {
            id: NEXT_STATE_EVENT_ID.fetch_add(1, Ordering::Relaxed),
            timestamp: -1,
            event_type: ComplexEventType::Current,
            stream_events,
            output_data: vec![AttributeValue::Null; output_size],
        }
    }

    /// Zero-slot placeholder with id 0. Never handed out.
    pub(crate) fn vacant() -> Self {
        Self {
            id: 0,
            timestamp: -1,
            event_type: ComplexEventType::Current,
            stream_events: SmallVec::new(),
            output_data: Vec::new(),
        }
    }

    /// Process-unique identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.stream_events.len()
    }

    /// Places `event` at `position`, replacing anything already there.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SlotOutOfRange`] if `position` is not a valid slot.
    pub fn add_event(&mut self, position: usize, event: StreamEvent) -> Result<(), EventError> {
        let slots = self.stream_events.len();
        let slot = self
            .stream_events
            .get_mut(position)
            .ok_or(EventError::SlotOutOfRange { position, slots })?;
        *slot = Some(event);
        Ok(())
    }

    /// Row buffer at `position`, if the slot exists and is filled.
    #[must_use]
    pub fn stream_event(&self, position: usize) -> Option<&StreamEvent> {
        self.stream_events.get(position).and_then(Option::as_ref)
    }

    /// Mutable row buffer at `position`.
    pub fn stream_event_mut(&mut self, position: usize) -> Option<&mut StreamEvent> {
        self.stream_events.get_mut(position).and_then(Option::as_mut)
    }

    /// Removes and returns the row buffer at `position`.
    pub fn take_stream_event(&mut self, position: usize) -> Option<StreamEvent> {
        self.stream_events.get_mut(position).and_then(Option::take)
    }

    /// Iterates over all slots in order.
    pub fn slots(&self) -> impl Iterator<Item = Option<&StreamEvent>> {
        self.stream_events.iter().map(Option::as_ref)
    }

    /// Event timestamp in milliseconds, `-1` when unset.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Sets the timestamp.
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

    /// Output values.
    #[must_use]
    pub fn output_data(&self) -> &[AttributeValue] {
        &self.output_data
    }

    /// Replaces the output values.
    pub fn set_output_data(&mut self, data: Vec<AttributeValue>) {
        self.output_data = data;
    }

    /// Mutable output values.
    pub fn output_data_mut(&mut self) -> &mut [AttributeValue] {
        &mut self.output_data
    }

    /// Returns `true` if the event is in the state produced by
    /// [`StateEvent::new`]: empty slots, null output, no timestamp.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.timestamp == -1
            && self.event_type == ComplexEventType::Current
            && self.stream_events.iter().all(Option::is_none)
            && self.output_data.iter().all(AttributeValue::is_null)
    }

    /// Restores the default state, keeping the slot count, output size and id.
    pub fn reset(&mut self, output_size: usize) {
        self.timestamp = -1;
        self.event_type = ComplexEventType::Current;
        for slot in &mut self.stream_events {
            *slot = None;
        }
        self.output_data.clear();
        self.output_data.resize(output_size, AttributeValue::Null);
    }
}
