//! State-change hook dispatch.
//!
//! Hooks never run on the caller's thread. Each transition is queued on an
//! unbounded channel and a dedicated worker thread invokes the hook, so a slow
//! or panicking hook cannot block or corrupt the breaker. The queue is FIFO and
//! transitions are queued in the order they happen, so the hook observes them
//! in that order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use crate::state::{State, Transition};

/// Callback invoked with `(old, new)` on every state change.
pub type StateChangeHook = Arc<dyn Fn(State, State) + Send + Sync + 'static>;

const WORKER_NAME: &str = "ecobreaker-hooks";

/// Hands transitions to the hook worker, if a hook is configured.
///
/// The worker lives as long as the sender, which is owned by the breaker's
/// shared state. A hook that captures a clone of its own breaker keeps both
/// alive, so a hook should hold a `Weak` reference to its breaker, or none.
pub(crate) struct HookDispatcher {
    sender: Option<Sender<Transition>>,
}

impl HookDispatcher {
    /// A dispatcher that drops every transition.
    pub(crate) fn disabled() -> Self {
        Self { sender: None }
    }

    /// Starts the worker thread for `hook`.
    ///
    /// The worker exits once the last breaker clone is dropped and the queue
    /// has been drained, dropping the hook on its way out. If the thread
    /// cannot be spawned the hook is disabled.
    pub(crate) fn spawn(hook: StateChangeHook) -> Self {
        let (sender, receiver) = mpsc::channel::<Transition>();

        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                for transition in receiver {
                    run_hook(&hook, transition);
                }
            });

        match spawned {
            Ok(_) => Self {
                sender: Some(sender),
            },
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "failed to start state-change hook worker, hook disabled"
                );
                Self::disabled()
            }
        }
    }

    /// Queues a transition. Never blocks.
    pub(crate) fn dispatch(&self, transition: Transition) {
        if let Some(sender) = &self.sender {
            if sender.send(transition).is_err() {
                tracing::warn!(
                    from = %transition.from,
                    to = %transition.to,
                    "state-change hook worker is gone, transition not delivered"
                );
            }
        }
    }
}

fn run_hook(hook: &StateChangeHook, transition: Transition) {
    let outcome =
        panic::catch_unwind(AssertUnwindSafe(|| hook(transition.from, transition.to)));

    if outcome.is_err() {
        tracing::error!(
            from = %transition.from,
            to = %transition.to,
            "state-change hook panicked"
        );
    }
}
