//! # ecobreaker
//!
//! A small circuit breaker for wrapping fallible calls to a dependency that
//! may be struggling.
//!
//! The breaker counts consecutive failures and, once they reach a threshold,
//! short-circuits further calls for a while so the dependency can recover. It
//! operates in three states:
//!
//! - **Closed**: Normal operation. Calls pass through and failures are counted.
//! - **Open**: Calls are immediately rejected without invoking the operation.
//! - **Half-Open**: After the open timeout, calls are let through again as
//!   probes. One failure reopens the circuit; enough successes close it.
//!
//! Time-based transitions are evaluated lazily when the breaker is used; no
//! background timer is involved.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ecobreaker::{BreakerError, CircuitBreaker, State};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::<String>::builder()
//!     .failure_threshold(3)
//!     .success_threshold(2)
//!     .open_timeout(Duration::from_secs(30))
//!     .build();
//!
//! match breaker.execute(|| Ok::<_, String>(42)) {
//!     Ok(value) => println!("Call succeeded: {}", value),
//!     Err(BreakerError::Open) => println!("Circuit is open, call was prevented"),
//!     Err(BreakerError::Operation(err)) => println!("Call failed: {}", err),
//! }
//!
//! assert_eq!(breaker.current_state(), State::Closed);
//! ```
//!
//! ## State-change hook
//!
//! ```rust
//! use ecobreaker::CircuitBreaker;
//!
//! let breaker = CircuitBreaker::<std::io::Error>::builder()
//!     .failure_threshold(1)
//!     .on_state_change(|old, new| println!("circuit {} -> {}", old, new))
//!     .build();
//! # let _ = breaker;
//! ```
//!
//! ## Features
//!
//! - `async` - `execute_async` for operations returning a future

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod config;
mod error;
mod hook;
pub mod prelude;
mod state;

// Re-exports
pub use breaker::CircuitBreaker;
pub use config::{
    BreakerBuilder, BreakerConfig, DEFAULT_FAILURE_RESET_WINDOW, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_OPEN_TIMEOUT, DEFAULT_SUCCESS_THRESHOLD,
};
pub use error::{BreakerError, BreakerResult};
pub use hook::StateChangeHook;
pub use state::State;
