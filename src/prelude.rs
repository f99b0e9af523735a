//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use ecobreaker::prelude::*;
//!
//! let breaker: CircuitBreaker<std::io::Error> = CircuitBreaker::builder().build();
//! assert!(breaker.current_state().is_closed());
//! ```

pub use crate::{BreakerError, BreakerResult, CircuitBreaker, State};
