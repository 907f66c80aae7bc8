//! Error types for the Railwatch environment abstraction.

use thiserror::Error;

/// Errors that can occur at the environment boundary.
///
/// These never reach a command caller: the broadcast hub classifies an
/// observer delivery failure with them and then logs and drops.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Observer queue is full; the message is skipped for that observer
    #[error("Observer {0} is lagging, message dropped")]
    ObserverLagging(String),
    
    /// Observer transport is gone (socket closed, receiver dropped)
    #[error("Observer {0} disconnected")]
    ObserverGone(String),
}

impl EnvError {
    /// Creates a lagging-observer error.
    pub fn lagging(observer: impl std::fmt::Display) -> Self {
        Self::ObserverLagging(observer.to_string())
    }
    
    /// Creates a gone-observer error.
    pub fn gone(observer: impl std::fmt::Display) -> Self {
        Self::ObserverGone(observer.to_string())
    }
    
    /// Returns true if the observer should be removed from the active set.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ObserverGone(_))
    }
}
