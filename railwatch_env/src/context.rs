//! Core environment context trait for the Railwatch engine.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the engine can run
/// in both production (tokio) and simulation (virtual clock) environments.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and the system clock
/// - **Simulation**: `SimContext` (in `railwatch_sim`) - manually advanced clock
///
/// # Determinism
///
/// Stop records are stamped with `system_time()` and the braking/stopped
/// notifications are timed with `sleep()`, so a simulated context makes
/// the whole stop timeline reproducible.
#[async_trait]
pub trait RailContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    fn now(&self) -> Duration;
    
    /// Returns the wall-clock time used to stamp stop records.
    ///
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;
    
    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: resolves once the virtual clock passes the deadline
    async fn sleep(&self, duration: Duration);
    
    /// Spawns a background task.
    ///
    /// Used for the deferred stop-sequence notifications.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
    
    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
