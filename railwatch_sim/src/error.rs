//! Simulation failures.

use railwatch_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// An invariant did not hold
    #[error("assertion failed: {0}")]
    Assertion(String),
    
    /// The engine rejected a command the scenario expected to succeed
    #[error("engine error: {0}")]
    Engine(#[from] CoreError),
    
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Fails with `SimError::Assertion` when `condition` is false.
pub fn check(condition: bool, message: impl FnOnce() -> String) -> Result<(), SimError> {
    if condition {
        Ok(())
    } else {
        Err(SimError::Assertion(message()))
    }
}
