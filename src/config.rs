//! Configuration for circuit breakers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::hook::StateChangeHook;
use crate::state::State;

/// Failures in a row, while closed, that trip the circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Successes in a row, while half-open, that close the circuit.
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 1;

/// How long the circuit stays open before letting a probe through.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Gap between two failures after which the earlier streak is forgotten.
pub const DEFAULT_FAILURE_RESET_WINDOW: Duration = Duration::from_secs(120);

/// Effective settings of a circuit breaker. Immutable once the breaker is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures while closed that trip the circuit. Always at least 1.
    pub failure_threshold: u32,

    /// Consecutive successes while half-open that close the circuit. Always at least 1.
    pub success_threshold: u32,

    /// Time the circuit must stay open before it is probed.
    pub open_timeout: Duration,

    /// A failure streak older than this is discarded on the next failure.
    pub failure_reset_window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            failure_reset_window: DEFAULT_FAILURE_RESET_WINDOW,
        }
    }
}

/// Builder for creating circuit breakers with custom configurations.
///
/// Out-of-range values (zero thresholds or zero durations) are ignored and the
/// previous value is kept, so building never fails.
pub struct BreakerBuilder<E> {
    config: BreakerConfig,
    on_state_change: Option<StateChangeHook>,
    _error_type: PhantomData<fn() -> E>,
}

impl<E> Default for BreakerBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for BreakerBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerBuilder")
            .field("config", &self.config)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}

impl<E> BreakerBuilder<E> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: BreakerConfig::default(),
            on_state_change: None,
            _error_type: PhantomData,
        }
    }

    /// Sets the number of consecutive failures required to trip the circuit.
    pub fn failure_threshold(mut self, count: u32) -> Self {
        if count > 0 {
            self.config.failure_threshold = count;
        } else {
            tracing::warn!(
                kept = self.config.failure_threshold,
                "ignoring failure_threshold of 0"
            );
        }
        self
    }

    /// Sets the number of consecutive successes required to close a half-open circuit.
    pub fn success_threshold(mut self, count: u32) -> Self {
        if count > 0 {
            self.config.success_threshold = count;
        } else {
            tracing::warn!(
                kept = self.config.success_threshold,
                "ignoring success_threshold of 0"
            );
        }
        self
    }

    /// Sets how long the circuit stays open before transitioning to half-open.
    pub fn open_timeout(mut self, duration: Duration) -> Self {
        if !duration.is_zero() {
            self.config.open_timeout = duration;
        } else {
            tracing::warn!(kept = ?self.config.open_timeout, "ignoring zero open_timeout");
        }
        self
    }

    /// Sets the gap after which a failure streak that never tripped is discarded.
    pub fn failure_reset_window(mut self, duration: Duration) -> Self {
        if !duration.is_zero() {
            self.config.failure_reset_window = duration;
        } else {
            tracing::warn!(
                kept = ?self.config.failure_reset_window,
                "ignoring zero failure_reset_window"
            );
        }
        self
    }

    /// Sets a hook called with `(old, new)` after every state change.
    ///
    /// The hook runs on a background thread, in transition order. A panic in
    /// the hook is caught and logged. The hook should not own a clone of the
    /// breaker it is registered on, or the breaker is never freed.
    pub fn on_state_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(State, State) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Changes the error type for the builder.
    pub fn with_error_type<NewE>(self) -> BreakerBuilder<NewE> {
        BreakerBuilder {
            config: self.config,
            on_state_change: self.on_state_change,
            _error_type: PhantomData,
        }
    }

    /// Builds a new circuit breaker with the configured settings.
    pub fn build(self) -> CircuitBreaker<E> {
        CircuitBreaker::new(self.config, self.on_state_change)
    }
}
