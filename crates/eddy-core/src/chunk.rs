//! Event chunks: the unit of submission into a selector.
//!
//! Continuous queries push multi-event batches through the selector; store
//! queries push a synthetic single-event chunk of the same shape, so the
//! selector never needs to tell the two apart.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::StateEvent;
use crate::pool::PooledEvent;

static NEXT_CHUNK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique chunk identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u64);

impl ChunkId {
    fn next() -> Self {
        Self(NEXT_CHUNK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk-{}", self.0)
    }
}

/// A state event held by a chunk, either owned outright or borrowed from
/// a pool. Pooled events go back to their pool when the chunk drops them.
#[derive(Debug)]
pub enum ChunkEvent {
    /// Owned by the chunk.
    Owned(StateEvent),
    /// Borrowed from a pool.
    Pooled(PooledEvent),
}

impl ChunkEvent {
    /// Returns `true` for pool-borrowed events.
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled(event) if event.is_pooled())
    }
}

impl Deref for ChunkEvent {
    type Target = StateEvent;

    fn deref(&self) -> &StateEvent {
        match self {
            Self::Owned(event) => event,
            Self::Pooled(event) => event,
        }
    }
}

impl DerefMut for ChunkEvent {
    fn deref_mut(&mut self) -> &mut StateEvent {
        match self {
            Self::Owned(event) => event,
            Self::Pooled(event) => event,
        }
    }
}

impl From<StateEvent> for ChunkEvent {
    fn from(event: StateEvent) -> Self {
        Self::Owned(event)
    }
}

impl From<PooledEvent> for ChunkEvent {
    fn from(event: PooledEvent) -> Self {
        Self::Pooled(event)
    }
}

/// Ordered, mutable batch of state events.
///
/// # Example
///
/// ```
/// use eddy_core::chunk::EventChunk;
/// use eddy_core::event::StateEvent;
///
/// let chunk = EventChunk::single(StateEvent::new(1, 0), true);
/// assert_eq!(chunk.len(), 1);
/// assert!(chunk.is_batch());
/// assert_eq!(chunk.first().map(|e| e.id()), chunk.last().map(|e| e.id()));
/// ```
#[derive(Debug)]
pub struct EventChunk {
    id: ChunkId,
    events: Vec<ChunkEvent>,
    batching: bool,
}

impl EventChunk {
    /// Creates an empty chunk.
    #[must_use]
    pub fn new(batching: bool) -> Self {
        Self {
            id: ChunkId::next(),
            events: Vec::new(),
            batching,
        }
    }

    /// Creates a chunk whose head and tail are `event`.
    #[must_use]
    pub fn single(event: impl Into<ChunkEvent>, batching: bool) -> Self {
        Self {
            id: ChunkId::next(),
            events: vec![event.into()],
            batching,
        }
    }

    /// Chunk identity.
    #[must_use]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Whether chunk mutation coalesces writes downstream.
    #[must_use]
    pub fn is_batch(&self) -> bool {
        self.batching
    }

    /// Appends an event at the tail.
    pub fn add(&mut self, event: impl Into<ChunkEvent>) {
        self.events.push(event.into());
    }

    /// Head event.
    #[must_use]
    pub fn first(&self) -> Option<&StateEvent> {
        self.events.first().map(Deref::deref)
    }

    /// Tail event.
    #[must_use]
    pub fn last(&self) -> Option<&StateEvent> {
        self.events.last().map(Deref::deref)
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the chunk holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StateEvent> {
        self.events.iter().map(Deref::deref)
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StateEvent> {
        self.events.iter_mut().map(DerefMut::deref_mut)
    }

    /// Keeps only the events for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&StateEvent) -> bool) {
        self.events.retain(|event| keep(&**event));
    }

    /// Drops every event, returning pooled ones to their pools.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Consumes the chunk, yielding its events.
    #[must_use]
    pub fn into_events(self) -> Vec<ChunkEvent> {
        self.events
    }
}
