//! Error taxonomy for the engine.

use railwatch_env::EnvError;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// `InvalidInput` and `NotFound` are returned to the command caller and
/// guarantee that no state changed. `TransportFailure` only ever appears
/// inside the broadcast hub, where it is logged and the observer dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Missing or malformed required field
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    
    /// Reference to an unregistered track id or entity
    #[error("Not found: {0}")]
    NotFound(String),
    
    /// An observer's channel is unreachable
    #[error("Transport failure: {0}")]
    TransportFailure(String),
}

impl CoreError {
    /// Creates an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
    
    /// Creates a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<EnvError> for CoreError {
    fn from(err: EnvError) -> Self {
        Self::TransportFailure(err.to_string())
    }
}

/// Errors raised while building the waypoint catalog at start-up.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Waypoint catalog is empty")]
    Empty,
    
    #[error("Duplicate waypoint id: {0}")]
    DuplicateId(String),
    
    #[error("Waypoint {0} has invalid coordinates")]
    InvalidCoordinate(String),
    
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
