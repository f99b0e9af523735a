//! Circuit breaker state machine implementation.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use crate::config::BreakerConfig;

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Circuit is closed and operations are allowed.
    Closed,

    /// Circuit is open and operations are rejected.
    Open,

    /// Circuit is letting operations through to test recovery.
    HalfOpen,
}

impl State {
    /// Returns true if the circuit is closed.
    pub fn is_closed(self) -> bool {
        self == State::Closed
    }

    /// Returns true if the circuit is open.
    pub fn is_open(self) -> bool {
        self == State::Open
    }

    /// Returns true if the circuit is half-open.
    pub fn is_half_open(self) -> bool {
        self == State::HalfOpen
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change performed by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: State,
    pub(crate) to: State,
}

/// State, counters and timestamps of a breaker.
///
/// The machine never reads the clock itself; every method takes `now` so the
/// caller decides what time it is. All mutation of `state` goes through
/// [`StateMachine::transition`].
#[derive(Debug)]
pub(crate) struct StateMachine {
    state: State,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            opened_at: None,
        }
    }

    /// The stored state, without applying the open timeout.
    pub(crate) fn state(&self) -> State {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn failure_count(&self) -> u32 {
        self.failure_count
    }

    #[cfg(test)]
    pub(crate) fn success_count(&self) -> u32 {
        self.success_count
    }

    /// Advances Open to Half-Open once `open_timeout` has strictly elapsed
    /// since the breaker opened.
    pub(crate) fn resolve(&mut self, now: Instant, open_timeout: Duration) -> Option<Transition> {
        if self.state != State::Open {
            return None;
        }

        let opened_at = self.opened_at?;
        if now.saturating_duration_since(opened_at) > open_timeout {
            self.transition(State::HalfOpen, now)
        } else {
            None
        }
    }

    /// Records a successful call against the current state.
    pub(crate) fn record_success(
        &mut self,
        now: Instant,
        config: &BreakerConfig,
    ) -> Option<Transition> {
        match self.state {
            State::Closed => {
                self.failure_count = 0;
                None
            }
            State::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.transition(State::Closed, now)
                } else {
                    None
                }
            }
            // Another caller reopened the circuit while this call was in flight.
            State::Open => None,
        }
    }

    /// Records a failed call against the current state.
    pub(crate) fn record_failure(
        &mut self,
        now: Instant,
        config: &BreakerConfig,
    ) -> Option<Transition> {
        match self.state {
            State::Closed => {
                if self.failure_count > 0
                    && self.streak_is_stale(now, config.failure_reset_window)
                {
                    tracing::trace!(
                        discarded = self.failure_count,
                        "failure streak outlived reset window"
                    );
                    self.failure_count = 0;
                }

                self.failure_count += 1;
                self.last_failure = Some(now);

                if self.failure_count >= config.failure_threshold {
                    self.transition(State::Open, now)
                } else {
                    None
                }
            }
            State::HalfOpen => self.transition(State::Open, now),
            State::Open => None,
        }
    }

    fn streak_is_stale(&self, now: Instant, window: Duration) -> bool {
        match self.last_failure {
            Some(last) => now.saturating_duration_since(last) > window,
            None => false,
        }
    }

    /// Moves to `to`, starting both counters fresh. No-op when already there.
    fn transition(&mut self, to: State, now: Instant) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }

        self.state = to;
        self.failure_count = 0;
        self.success_count = 0;
        if to == State::Open {
            self.opened_at = Some(now);
        }

        Some(Transition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(failures: u32, successes: u32) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: failures,
            success_threshold: successes,
            open_timeout: Duration::from_millis(100),
            failure_reset_window: Duration::from_secs(60),
        }
    }

    fn trip(machine: &mut StateMachine, now: Instant, config: &BreakerConfig) {
        for _ in 0..config.failure_threshold {
            machine.record_failure(now, config);
        }
        assert_eq!(machine.state(), State::Open);
    }

    #[test]
    fn stays_closed_below_threshold() {
        let cfg = config(3, 1);
        let now = Instant::now();
        let mut machine = StateMachine::new();

        assert_eq!(machine.record_failure(now, &cfg), None);
        assert_eq!(machine.record_failure(now, &cfg), None);
        assert_eq!(machine.state(), State::Closed);
        assert_eq!(machine.failure_count(), 2);

        let transition = machine.record_failure(now, &cfg);
        assert_eq!(
            transition,
            Some(Transition {
                from: State::Closed,
                to: State::Open
            })
        );
        assert_eq!(machine.failure_count(), 0);
    }

    #[test]
    fn success_clears_partial_streak() {
        let cfg = config(3, 1);
        let now = Instant::now();
        let mut machine = StateMachine::new();

        machine.record_failure(now, &cfg);
        machine.record_failure(now, &cfg);
        assert_eq!(machine.record_success(now, &cfg), None);
        assert_eq!(machine.failure_count(), 0);

        machine.record_failure(now, &cfg);
        machine.record_failure(now, &cfg);
        assert_eq!(machine.state(), State::Closed);
    }

    #[test]
    fn stale_streak_is_discarded() {
        let mut cfg = config(2, 1);
        cfg.failure_reset_window = Duration::from_secs(10);
        let start = Instant::now();
        let mut machine = StateMachine::new();

        machine.record_failure(start, &cfg);
        let later = start + Duration::from_secs(11);
        assert_eq!(machine.record_failure(later, &cfg), None);
        assert_eq!(machine.state(), State::Closed);
        assert_eq!(machine.failure_count(), 1);

        // Within the window the streak keeps counting.
        let soon = later + Duration::from_secs(1);
        assert!(machine.record_failure(soon, &cfg).is_some());
        assert_eq!(machine.state(), State::Open);
    }

    #[test]
    fn open_resolves_only_after_timeout() {
        let cfg = config(1, 1);
        let start = Instant::now();
        let mut machine = StateMachine::new();
        trip(&mut machine, start, &cfg);

        assert_eq!(
            machine.resolve(start + cfg.open_timeout, cfg.open_timeout),
            None
        );
        assert_eq!(machine.state(), State::Open);

        let after = start + cfg.open_timeout + Duration::from_millis(1);
        assert_eq!(
            machine.resolve(after, cfg.open_timeout),
            Some(Transition {
                from: State::Open,
                to: State::HalfOpen
            })
        );
        assert_eq!(machine.state(), State::HalfOpen);
    }

    #[test]
    fn half_open_failure_reopens_and_restarts_timer() {
        let cfg = config(1, 2);
        let start = Instant::now();
        let mut machine = StateMachine::new();
        trip(&mut machine, start, &cfg);

        let probe = start + Duration::from_millis(150);
        machine.resolve(probe, cfg.open_timeout);
        machine.record_success(probe, &cfg);
        assert_eq!(machine.success_count(), 1);

        assert!(machine.record_failure(probe, &cfg).is_some());
        assert_eq!(machine.state(), State::Open);
        assert_eq!(machine.success_count(), 0);

        // The timeout runs from the reopen, not the first trip.
        assert_eq!(
            machine.resolve(probe + Duration::from_millis(50), cfg.open_timeout),
            None
        );
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let cfg = config(1, 2);
        let start = Instant::now();
        let mut machine = StateMachine::new();
        trip(&mut machine, start, &cfg);

        let probe = start + Duration::from_millis(150);
        machine.resolve(probe, cfg.open_timeout);
        assert_eq!(machine.record_success(probe, &cfg), None);
        assert_eq!(
            machine.record_success(probe, &cfg),
            Some(Transition {
                from: State::HalfOpen,
                to: State::Closed
            })
        );
        assert_eq!(machine.success_count(), 0);
    }

    #[test]
    fn outcomes_are_ignored_while_open() {
        let cfg = config(1, 1);
        let now = Instant::now();
        let mut machine = StateMachine::new();
        trip(&mut machine, now, &cfg);

        assert_eq!(machine.record_failure(now, &cfg), None);
        assert_eq!(machine.record_success(now, &cfg), None);
        assert_eq!(machine.failure_count(), 0);
        assert_eq!(machine.state(), State::Open);
    }

    #[test]
    fn state_names() {
        assert_eq!(State::Closed.to_string(), "closed");
        assert_eq!(State::Open.to_string(), "open");
        assert_eq!(State::HalfOpen.to_string(), "half-open");
        assert!(State::HalfOpen.is_half_open());
        assert!(!State::Open.is_closed());
    }
}
