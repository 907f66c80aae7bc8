//! Broadcast Hub - best-effort fan-out to connected observers.
//!
//! Each observer owns a bounded queue. Publishing is a non-blocking
//! `try_send` per observer, so one slow observer never delays the rest:
//!
//! ```text
//!                 ┌──────────────┐   try_send   ┌────────────┐
//!  RailEvent ───► │ BroadcastHub │ ───────────► │ observer A │ ─► socket
//!                 │  (registry)  │ ───────────► │ observer B │ ─► socket
//!                 └──────────────┘   (full: skip, closed: drop)
//! ```

use crate::error::CoreError;
use crate::events::{PushMessage, RailEvent, Snapshot};
use railwatch_env::{EnvError, ObserverId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

type ObserverTx = mpsc::Sender<Arc<PushMessage>>;

/// Receiving end handed to a newly connected observer.
///
/// The first message in the queue is always the connection snapshot.
#[derive(Debug)]
pub struct Subscription {
    pub id: ObserverId,
    pub receiver: mpsc::Receiver<Arc<PushMessage>>,
}

/// Outcome of one publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Observers whose queue accepted the message
    pub delivered: usize,
    /// Observers that missed the message because their queue was full
    pub lagged: usize,
    /// Observers removed because their queue was closed
    pub dropped: Vec<ObserverId>,
    /// `TransportFailure` for each dropped observer, in the same order
    pub failures: Vec<CoreError>,
}

/// Registry of observer queues.
pub struct BroadcastHub {
    observers: Mutex<HashMap<ObserverId, ObserverTx>>,
    capacity: usize,
}

impl BroadcastHub {
    /// Creates a hub whose observer queues hold `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
    
    fn registry(&self) -> MutexGuard<'_, HashMap<ObserverId, ObserverTx>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
    
    /// Adds an observer and queues its connection snapshot.
    pub fn register(&self, snapshot: Snapshot) -> Subscription {
        let id = ObserverId::new();
        let (tx, receiver) = mpsc::channel(self.capacity);
        
        // Fresh queue with capacity >= 1: cannot be full or closed
        let _ = tx.try_send(Arc::new(PushMessage::Snapshot(snapshot)));
        
        let count = {
            let mut observers = self.registry();
            observers.insert(id, tx);
            observers.len()
        };
        debug!("Observer {} connected ({} active)", id, count);
        
        Subscription { id, receiver }
    }
    
    /// Removes an observer. Returns false if it was already gone.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            debug!("Observer {} disconnected", id);
        }
        removed
    }
    
    pub fn observer_count(&self) -> usize {
        self.registry().len()
    }
    
    /// Delivers `event` to every currently registered observer.
    ///
    /// The registry is copied before iterating, so an observer that
    /// disconnects mid-broadcast only costs a dropped send.
    pub fn publish(&self, event: RailEvent) -> DeliveryReport {
        let message = Arc::new(PushMessage::Event(event));
        let targets: Vec<(ObserverId, ObserverTx)> = self
            .registry()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();
        
        let mut report = DeliveryReport::default();
        for (id, tx) in targets {
            match deliver(id, &tx, Arc::clone(&message)) {
                Ok(()) => report.delivered += 1,
                Err(err) if err.is_fatal() => {
                    let failure = CoreError::from(err);
                    warn!("Dropping observer {}: {}", id, failure);
                    report.dropped.push(id);
                    report.failures.push(failure);
                }
                Err(err) => {
                    debug!("{}", err);
                    report.lagged += 1;
                }
            }
        }
        
        if !report.dropped.is_empty() {
            let mut observers = self.registry();
            for id in &report.dropped {
                observers.remove(id);
            }
        }
        
        report
    }
}

fn deliver(id: ObserverId, tx: &ObserverTx, message: Arc<PushMessage>) -> Result<(), EnvError> {
    tx.try_send(message).map_err(|err| match err {
        TrySendError::Full(_) => EnvError::lagging(id),
        TrySendError::Closed(_) => EnvError::gone(id),
    })
}
