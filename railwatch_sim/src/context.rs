//! Simulation context implementing RailContext for deterministic testing.

use async_trait::async_trait;
use railwatch_env::RailContext;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::Instrument;

/// 2024-01-01 00:00:00 UTC
pub const SIM_EPOCH_SECS: u64 = 1_704_067_200;

/// Simulation context backed by a virtual clock.
///
/// This implements `RailContext` using:
/// - A virtual clock that only moves when [`advance_time`](Self::advance_time) is called
/// - Sleeps that resolve once virtual time reaches their deadline
/// - A fixed epoch so wall-clock timestamps are reproducible
///
/// A sleep's deadline is taken when the sleeping task is first polled, so
/// callers let spawned tasks run before advancing the clock.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,
    
    /// Current virtual time (nanoseconds since simulation start)
    clock: Arc<watch::Sender<u64>>,
    
    /// Epoch offset (virtual time 0 maps to this wall-clock time)
    epoch: SystemTime,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        let (clock, _) = watch::channel(0);
        Self {
            seed,
            clock: Arc::new(clock),
            epoch: UNIX_EPOCH + Duration::from_secs(SIM_EPOCH_SECS),
        }
    }
    
    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }
    
    /// Advances virtual time and wakes every sleeper whose deadline passed.
    pub fn advance_time(&self, duration: Duration) {
        let step = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.clock.send_modify(|ns| *ns = ns.saturating_add(step));
    }
    
    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.clock.borrow()
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            clock: Arc::clone(&self.clock),
            epoch: self.epoch,
        }
    }
}

#[async_trait]
impl RailContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }
    
    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }
    
    async fn sleep(&self, duration: Duration) {
        let deadline = self.now().saturating_add(duration);
        let mut rx = self.clock.subscribe();
        // Err only if the clock is gone, in which case nothing will wake us anyway
        let _ = rx.wait_for(|ns| Duration::from_nanos(*ns) >= deadline).await;
    }
    
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let span = tracing::debug_span!("sim_task", name = %name);
        tokio::spawn(future.instrument(span));
    }
    
    fn seed(&self) -> u64 {
        self.seed
    }
}

/// Lets every runnable task on the current-thread runtime make progress.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    
    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);
        
        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));
        
        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }
    
    #[test]
    fn test_sim_context_epoch() {
        let ctx = SimContext::new(1);
        ctx.advance_time(Duration::from_secs(10));
        let expected = UNIX_EPOCH + Duration::from_secs(SIM_EPOCH_SECS + 10);
        assert_eq!(ctx.system_time(), expected);
    }
    
    #[test]
    fn test_sim_context_seed() {
        let ctx = SimContext::new(12345);
        assert_eq!(ctx.seed(), 12345);
    }
    
    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42);
        let ctx2 = ctx1.clone();
        
        ctx1.advance_time(Duration::from_secs(5));
        
        // Both should see the same time
        assert_eq!(ctx1.now(), ctx2.now());
    }
    
    #[tokio::test(flavor = "current_thread")]
    async fn test_sleep_waits_for_virtual_deadline() {
        let ctx = SimContext::shared(7);
        let woke = Arc::new(AtomicBool::new(false));
        
        let task_ctx = Arc::clone(&ctx);
        let task_woke = Arc::clone(&woke);
        ctx.spawn("sleeper", async move {
            task_ctx.sleep(Duration::from_secs(2)).await;
            task_woke.store(true, Ordering::SeqCst);
        });
        settle().await;
        
        ctx.advance_time(Duration::from_millis(1999));
        settle().await;
        assert!(!woke.load(Ordering::SeqCst));
        
        ctx.advance_time(Duration::from_millis(1));
        settle().await;
        assert!(woke.load(Ordering::SeqCst));
    }
}
