//! State event pool configuration.

/// Default number of pooled events (pre-allocated and retained).
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Minimum pool size.
pub const MIN_POOL_SIZE: usize = 1;

/// Maximum pool size (prevent excessive memory usage).
pub const MAX_POOL_SIZE: usize = 1 << 16;

/// What the pool does when every event it may hand out is borrowed.
///
/// There is no blocking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Allocate a fresh event. Only `max_size` events are retained on return,
    /// the rest are dropped.
    #[default]
    Grow,

    /// Fail the borrow with [`PoolError::Exhausted`](super::PoolError::Exhausted)
    /// once `max_size` events are outstanding.
    Reject,
}

/// Configuration for a [`StateEventPool`](super::StateEventPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Events allocated up front.
    pub initial_size: usize,

    /// Events retained (`Grow`) or outstanding at most (`Reject`).
    pub max_size: usize,

    /// Slot count of every pooled event.
    pub slots: usize,

    /// Output array length of every pooled event.
    pub output_size: usize,

    /// Behavior on exhaustion.
    pub exhaustion: ExhaustionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_POOL_SIZE,
            max_size: DEFAULT_POOL_SIZE,
            slots: 1,
            output_size: 0,
            exhaustion: ExhaustionPolicy::Grow,
        }
    }
}

impl PoolConfig {
    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Configuration for aggregate-backed queries: two slots per event.
    #[must_use]
    pub fn for_aggregation(output_size: usize) -> Self {
        Self {
            slots: 2,
            output_size,
            ..Self::default()
        }
    }
}

/// Builder for `PoolConfig`.
#[derive(Debug, Default)]
pub struct PoolConfigBuilder {
    initial_size: Option<usize>,
    max_size: Option<usize>,
    slots: Option<usize>,
    output_size: Option<usize>,
    exhaustion: Option<ExhaustionPolicy>,
}

impl PoolConfigBuilder {
    /// Sets the number of events allocated up front.
    #[must_use]
    pub fn initial_size(mut self, size: usize) -> Self {
        self.initial_size = Some(size);
        self
    }

    /// Sets the retained/outstanding bound.
    #[must_use]
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Sets the slot count of pooled events.
    #[must_use]
    pub fn slots(mut self, slots: usize) -> Self {
        self.slots = Some(slots);
        self
    }

    /// Sets the output array length of pooled events.
    #[must_use]
    pub fn output_size(mut self, size: usize) -> Self {
        self.output_size = Some(size);
        self
    }

    /// Sets the exhaustion policy.
    #[must_use]
    pub fn exhaustion(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion = Some(policy);
        self
    }

    /// Builds the configuration.
    ///
    /// Sizes are clamped to `[MIN_POOL_SIZE, MAX_POOL_SIZE]` and the initial
    /// size never exceeds the max size. At least one slot is kept.
    #[must_use]
    pub fn build(self) -> PoolConfig {
        let max_size = self
            .max_size
            .unwrap_or(DEFAULT_POOL_SIZE)
            .clamp(MIN_POOL_SIZE, MAX_POOL_SIZE);
        PoolConfig {
            initial_size: self.initial_size.unwrap_or(DEFAULT_POOL_SIZE).min(max_size),
            max_size,
            slots: self.slots.unwrap_or(1).max(1),
            output_size: self.output_size.unwrap_or(0),
            exhaustion: self.exhaustion.unwrap_or_default(),
        }
    }
}
