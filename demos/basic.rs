//! Walks a breaker through a trip, a cooldown and a recovery.
//!
//! Run with `RUST_LOG=ecobreaker=debug cargo run --example basic` to see the
//! breaker's own log events next to the output.

use ecobreaker::{BreakerError, CircuitBreaker};
use std::error::Error;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct ServiceError(String);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

// Fails for calls 4 through 8, succeeds otherwise.
fn call_service(counter: &mut u32) -> Result<String, ServiceError> {
    *counter += 1;
    if (4..=8).contains(counter) {
        Err(ServiceError("External service error".to_string()))
    } else {
        Ok(format!("response #{}", counter))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let breaker = CircuitBreaker::<ServiceError>::builder()
        .failure_threshold(3)
        .success_threshold(2)
        .open_timeout(Duration::from_secs(1))
        .on_state_change(|old, new| println!("  [hook] circuit {} -> {}", old, new))
        .build();

    println!("Circuit initial state: {}", breaker.current_state());

    let mut counter = 0;

    for i in 1..=15 {
        println!("\nAttempt {}:", i);

        match breaker.execute(|| call_service(&mut counter)) {
            Ok(result) => println!("Call succeeded with result: {}", result),
            Err(BreakerError::Open) => {
                println!("Circuit is open, waiting before retry...");
                thread::sleep(Duration::from_millis(600));
            }
            Err(BreakerError::Operation(err)) => println!("Call failed with error: {}", err),
        }

        println!("Current state: {}", breaker.current_state());
        thread::sleep(Duration::from_millis(100));
    }
}
