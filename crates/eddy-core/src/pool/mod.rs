//! # State Event Pool
//!
//! Recycles [`StateEvent`]s shared by the continuous and on-demand paths.
//!
//! Borrowing hands out an owned [`PooledEvent`]. The handle derefs to the
//! event and sends it back to its pool when dropped, so an event cannot be
//! touched after it was returned and is never lent to two callers at once.
//!
//! ```
//! use eddy_core::pool::{EventSource, PoolConfig, StateEventPool};
//!
//! let pool = StateEventPool::new(PoolConfig::for_aggregation(1));
//! let event = pool.borrow_event().unwrap();
//! assert_eq!(event.slot_count(), 2);
//! assert_eq!(pool.stats().in_use, 1);
//!
//! drop(event);
//! assert_eq!(pool.stats().in_use, 0);
//! ```

mod config;

pub use config::{
    ExhaustionPolicy, PoolConfig, PoolConfigBuilder, DEFAULT_POOL_SIZE, MAX_POOL_SIZE,
    MIN_POOL_SIZE,
};

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::StateEvent;

/// Errors raised by event pools.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Every event the pool may hand out is borrowed.
    #[error("state event pool exhausted ({capacity} events outstanding)")]
    Exhausted {
        /// Outstanding bound of the pool.
        capacity: usize,
    },
}

/// Anything that can lend state events.
///
/// Implemented by [`StateEventPool`]; tests and embedders may supply their
/// own sources.
pub trait EventSource: Send + Sync {
    /// Borrows an event in its default state.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if no event can be lent.
    fn borrow_event(&self) -> Result<PooledEvent, PoolError>;

    /// Slot count of every event this source lends.
    fn slots(&self) -> usize;
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Events ready to be borrowed.
    pub available: usize,
    /// Events currently borrowed.
    pub in_use: usize,
    /// Events ever allocated by the pool.
    pub allocated: usize,
    /// Successful borrows.
    pub borrows: u64,
}

struct PoolState {
    free_list: Vec<StateEvent>,
    in_use: usize,
    allocated: usize,
}

struct PoolShared {
    config: PoolConfig,
    state: Mutex<PoolState>,
    borrows: AtomicU64,
}

impl PoolShared {
    fn recycle(&self, mut event: StateEvent) {
        event.reset(self.config.output_size);
        let mut state = self.state.lock();
        state.in_use = state.in_use.saturating_sub(1);
        if state.free_list.len() < self.config.max_size {
            state.free_list.push(event);
        } else {
            tracing::trace!(id = event.id(), "pool full, dropping returned state event");
        }
    }
}

/// Thread-safe pool of [`StateEvent`]s.
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Clone)]
pub struct StateEventPool {
    shared: Arc<PoolShared>,
}

impl StateEventPool {
    /// Creates a pool, pre-allocating `config.initial_size` events.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        let free_list: Vec<StateEvent> = (0..config.initial_size)
            .map(|_| StateEvent::new(config.slots, config.output_size))
            .collect();
        let allocated = free_list.len();
        Self {
            shared: Arc::new(PoolShared {
                config,
                state: Mutex::new(PoolState {
                    free_list,
                    in_use: 0,
                    allocated,
                }),
                borrows: AtomicU64::new(0),
            }),
        }
    }

    /// Borrows an event, recycling a free one when possible.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Exhausted`] under [`ExhaustionPolicy::Reject`]
    /// once `max_size` events are outstanding.
    pub fn borrow(&self) -> Result<PooledEvent, PoolError> {
        let config = &self.shared.config;
        let event = {
            let mut state = self.shared.state.lock();
            let event = if let Some(event) = state.free_list.pop() {
                event
            } else {
                if config.exhaustion == ExhaustionPolicy::Reject && state.in_use >= config.max_size
                {
                    return Err(PoolError::Exhausted {
                        capacity: config.max_size,
                    });
                }
                state.allocated += 1;
                tracing::trace!(allocated = state.allocated, "growing state event pool");
                StateEvent::new(config.slots, config.output_size)
            };
            state.in_use += 1;
            event
        };
        self.shared.borrows.fetch_add(1, Ordering::Relaxed);
        Ok(PooledEvent {
            event,
            home: Some(Arc::clone(&self.shared)),
        })
    }

    /// Pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            available: state.free_list.len(),
            in_use: state.in_use,
            allocated: state.allocated,
            borrows: self.shared.borrows.load(Ordering::Relaxed),
        }
    }
}

impl EventSource for StateEventPool {
    fn borrow_event(&self) -> Result<PooledEvent, PoolError> {
        self.borrow()
    }

    fn slots(&self) -> usize {
        self.shared.config.slots
    }
}

impl fmt::Debug for StateEventPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateEventPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A borrowed state event.
///
/// Dropping the handle resets the event and returns it to its pool.
/// A [`detached`](PooledEvent::detached) handle has no pool and simply
/// drops its event.
pub struct PooledEvent {
    event: StateEvent,
    home: Option<Arc<PoolShared>>,
}

impl PooledEvent {
    /// Wraps an event that belongs to no pool.
    #[must_use]
    pub fn detached(event: StateEvent) -> Self {
        Self { event, home: None }
    }

    /// Returns `true` if the event goes back to a pool on drop.
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        self.home.is_some()
    }

    /// Returns the event to its pool. Same as dropping the handle.
    pub fn release(self) {}
}

impl Deref for PooledEvent {
    type Target = StateEvent;

    fn deref(&self) -> &StateEvent {
        &self.event
    }
}

impl DerefMut for PooledEvent {
    fn deref_mut(&mut self) -> &mut StateEvent {
        &mut self.event
    }
}

impl Drop for PooledEvent {
    fn drop(&mut self) {
        if let Some(home) = self.home.take() {
            let event = std::mem::replace(&mut self.event, StateEvent::vacant());
            home.recycle(event);
        }
    }
}

impl fmt::Debug for PooledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledEvent")
            .field("event", &self.event)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}
