//! Core circuit breaker implementation.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::{BreakerBuilder, BreakerConfig};
use crate::error::{BreakerError, BreakerResult};
use crate::hook::{HookDispatcher, StateChangeHook};
use crate::state::{State, StateMachine, Transition};

/// Inner state of the circuit breaker, shared between clones.
struct BreakerInner {
    machine: Mutex<StateMachine>,
    config: BreakerConfig,
    hooks: HookDispatcher,
}

impl BreakerInner {
    /// Applies the lazy open timeout and returns the resulting state.
    fn resolve(&self, machine: &mut StateMachine) -> State {
        let transition = machine.resolve(Instant::now(), self.config.open_timeout);
        self.announce(transition);
        machine.state()
    }

    fn record(&self, success: bool) {
        let mut machine = self.machine.lock();
        let now = Instant::now();

        let transition = if success {
            machine.record_success(now, &self.config)
        } else {
            machine.record_failure(now, &self.config)
        };

        self.announce(transition);
    }

    // Called with the lock held; dispatch only enqueues, so queue order is
    // transition order.
    fn announce(&self, transition: Option<Transition>) {
        if let Some(transition) = transition {
            tracing::debug!(
                from = %transition.from,
                to = %transition.to,
                "circuit breaker state changed"
            );
            self.hooks.dispatch(transition);
        }
    }
}

/// A circuit breaker that can wrap function calls to prevent cascading failures.
///
/// State is only advanced when the breaker is used: there is no timer, so an
/// idle open breaker stays open until the next [`execute`](Self::execute) or
/// [`current_state`](Self::current_state) call notices the timeout has passed.
///
/// The lock guarding the state is held only while admitting a call and while
/// recording its outcome, never while the wrapped operation runs.
pub struct CircuitBreaker<E> {
    inner: Arc<BreakerInner>,
    _error_type: PhantomData<fn() -> E>,
}

impl<E> CircuitBreaker<E> {
    pub(crate) fn new(config: BreakerConfig, on_state_change: Option<StateChangeHook>) -> Self {
        let hooks = match on_state_change {
            Some(hook) => HookDispatcher::spawn(hook),
            None => HookDispatcher::disabled(),
        };

        let inner = BreakerInner {
            machine: Mutex::new(StateMachine::new()),
            config,
            hooks,
        };

        Self {
            inner: Arc::new(inner),
            _error_type: PhantomData,
        }
    }

    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> BreakerBuilder<E> {
        BreakerBuilder::new()
    }

    /// Gets the current state of the circuit breaker.
    ///
    /// An open circuit whose timeout has elapsed is moved to half-open first.
    pub fn current_state(&self) -> State {
        let mut machine = self.inner.machine.lock();
        self.inner.resolve(&mut machine)
    }

    /// Gets the effective configuration.
    pub fn config(&self) -> &BreakerConfig {
        &self.inner.config
    }

    /// Executes a function wrapped by the circuit breaker.
    ///
    /// Returns [`BreakerError::Open`] without calling `f` while the circuit is
    /// open. Otherwise `f` is called exactly once and its result is returned,
    /// with an error wrapped in [`BreakerError::Operation`].
    pub fn execute<F, T>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.admit()?;

        let result = f();
        self.inner.record(result.is_ok());

        result.map_err(BreakerError::Operation)
    }

    /// Checks if a call is allowed based on the current state.
    fn admit(&self) -> Result<(), BreakerError<E>> {
        let mut machine = self.inner.machine.lock();

        if self.inner.resolve(&mut machine).is_open() {
            tracing::trace!("call rejected, circuit is open");
            return Err(BreakerError::Open);
        }

        Ok(())
    }
}

impl<E> Clone for CircuitBreaker<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _error_type: PhantomData,
        }
    }
}

impl<E> fmt::Debug for CircuitBreaker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.inner.machine.lock().state())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(feature = "async")]
impl<E> CircuitBreaker<E> {
    /// Executes an async function wrapped by the circuit breaker.
    ///
    /// Same contract as [`execute`](Self::execute). The lock is not held
    /// across the await. If the returned future is dropped before the
    /// operation finishes, no outcome is recorded.
    pub async fn execute_async<F, Fut, T>(&self, f: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.admit()?;

        let result = f().await;
        self.inner.record(result.is_ok());

        result.map_err(BreakerError::Operation)
    }
}
