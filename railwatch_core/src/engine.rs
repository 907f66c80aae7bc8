//! Rail Engine - the single owner of live state.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       RailEngine                          │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │            Context: RailContext                     │  │
//! │  │  • system_time() → stop timestamps                  │  │
//! │  │  • sleep()/spawn() → deferred stop notifications    │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │  ┌──────────────── Mutex<RailState> ──────────────────┐   │
//! │  │ PositionTracker │ SignalRegistry │ StopController  │   │
//! │  └────────────────────────────────────────────────────┘   │
//! │                          │ publish (under lock)           │
//! │                    ┌─────▼──────┐                         │
//! │                    │BroadcastHub│ ──► observers           │
//! │                    └────────────┘                         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation and the publication of its event happen while the state
//! lock is held, which makes each command indivisible and gives all
//! observers the same event order.

use crate::catalog::WaypointCatalog;
use crate::collision::CollisionEvaluator;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::events::{RailEvent, Snapshot};
use crate::geo::Coordinate;
use crate::hub::{BroadcastHub, Subscription};
use crate::position::{NearestWaypoint, PositionFix, PositionTracker};
use crate::signals::{Level, Side, SignalRegistry, SignalTable};
use crate::stop::{StopController, StopPhase, StopRecord, StopTicket};

use chrono::{DateTime, Utc};
use railwatch_env::{ObserverId, RailContext};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Result of a position update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub fix: PositionFix,
    pub nearest: NearestWaypoint,
}

impl PositionReport {
    /// The `LOCATION_UPDATE` event this report was published as.
    pub fn to_event(&self) -> RailEvent {
        RailEvent::LocationUpdate {
            lat: self.fix.lat,
            lng: self.fix.lng,
            nearest: self.nearest.clone(),
        }
    }
}

/// All mutable state, guarded by one lock.
struct RailState {
    tracker: PositionTracker,
    signals: SignalRegistry,
    stop: StopController,
}

impl RailState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.tracker.fix(),
            nearest: self.tracker.nearest().clone(),
            signals: self.signals.table().clone(),
            emergency_stop: self.stop.active().cloned(),
        }
    }
}

/// State plus hub, shared with deferred tasks.
struct Shared {
    state: Mutex<RailState>,
    hub: BroadcastHub,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
    
    fn fire_stop_phase(&self, ticket: &StopTicket, phase: StopPhase, cancel_stale: bool) {
        let state = self.lock();
        if cancel_stale && !state.stop.is_current(ticket.generation) {
            debug!(
                "Discarding stale {:?} notice for {} (generation {})",
                phase, ticket.record.entity_id, ticket.generation
            );
            return;
        }
        
        info!("Stop sequence for {}: {:?}", ticket.record.entity_id, phase);
        self.hub.publish(RailEvent::StopProgress {
            entity_id: ticket.record.entity_id.clone(),
            phase,
            issued_at: ticket.record.issued_at,
        });
    }
}

/// The live state-synchronization engine.
///
/// Generic over the context so the same engine runs against tokio in
/// production and a virtual clock in simulation. Cloning is cheap and
/// every clone drives the same state.
pub struct RailEngine<Ctx>
where
    Ctx: RailContext,
{
    context: Arc<Ctx>,
    catalog: Arc<WaypointCatalog>,
    config: Arc<EngineConfig>,
    shared: Arc<Shared>,
}

impl<Ctx: RailContext> Clone for RailEngine<Ctx> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            catalog: Arc::clone(&self.catalog),
            config: Arc::clone(&self.config),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<Ctx> RailEngine<Ctx>
where
    Ctx: RailContext,
{
    /// Creates an engine in its default state: parked on the first
    /// waypoint, every signal `safe`, no stop.
    pub fn new(context: Arc<Ctx>, catalog: WaypointCatalog, config: EngineConfig) -> Self {
        let catalog = Arc::new(catalog);
        let evaluator = CollisionEvaluator::new(config.collision_threshold_km);
        
        let state = RailState {
            tracker: PositionTracker::new(Arc::clone(&catalog), evaluator),
            signals: SignalRegistry::new(&config.track_ids),
            stop: StopController::new(),
        };
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            hub: BroadcastHub::new(config.observer_queue_capacity),
        });
        
        info!(
            "{} engine ready: {} waypoints, tracks {:?} (seed={})",
            config.name,
            catalog.len(),
            config.track_ids,
            context.seed()
        );
        
        Self {
            context,
            catalog,
            config: Arc::new(config),
            shared,
        }
    }
    
    pub fn catalog(&self) -> &WaypointCatalog {
        &self.catalog
    }
    
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
    
    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }
    
    /// Stores a new fix and publishes `LOCATION_UPDATE`.
    ///
    /// Invalid coordinates fail before anything is touched.
    pub fn update_position(&self, lat: f64, lng: f64) -> Result<PositionReport, CoreError> {
        let coordinate = Coordinate::checked(lat, lng)?;
        
        let mut state = self.shared.lock();
        let (fix, nearest) = state.tracker.update(coordinate);
        let report = PositionReport { fix, nearest };
        
        debug!(
            "Position {:.5},{:.5} -> {} ({:.3} km, risk={})",
            fix.lat, fix.lng, report.nearest.name, report.nearest.distance_km, report.nearest.risk
        );
        self.shared.hub.publish(report.to_event());
        
        Ok(report)
    }
    
    /// Advances one side of one track and returns the new level.
    pub fn advance_signal(&self, track_id: &str, side: Side) -> Result<Level, CoreError> {
        let table = self.advance_signals(track_id, &[side])?;
        Ok(table.get(track_id).map(|pair| pair.get(side)).unwrap_or_default())
    }
    
    /// Advances each listed side one step and publishes one `SIGNAL_UPDATE`
    /// with the full table.
    ///
    /// The track is checked before any side moves, so a `NotFound` leaves
    /// the table untouched.
    pub fn advance_signals(&self, track_id: &str, sides: &[Side]) -> Result<SignalTable, CoreError> {
        if sides.is_empty() {
            return Err(CoreError::invalid_input("Missing trackId or signal state"));
        }
        
        let mut state = self.shared.lock();
        if !state.signals.contains(track_id) {
            return Err(CoreError::not_found(format!("Track ID not found: {track_id}")));
        }
        
        for side in sides {
            let level = state.signals.advance(track_id, *side)?;
            debug!("Signal {} {} -> {}", track_id, side, level);
        }
        
        let table = state.signals.table().clone();
        self.shared.hub.publish(RailEvent::SignalUpdate { signals: table.clone() });
        
        Ok(table)
    }
    
    /// Records an emergency stop, publishes `EMERGENCY_STOP` and schedules
    /// the braking/stopped notifications.
    pub fn trigger_stop(&self, entity_id: &str) -> Result<StopRecord, CoreError> {
        let (ticket, triggered_at) = {
            let mut state = self.shared.lock();
            // Stamped under the lock so record order and stamp order agree
            let issued_at: DateTime<Utc> = self.context.system_time().into();
            let triggered_at = self.context.now();
            let ticket = state.stop.trigger(entity_id, issued_at)?;
            self.shared.hub.publish(RailEvent::from(&ticket.record));
            (ticket, triggered_at)
        };
        
        info!("EMERGENCY STOP TRIGGERED FOR {}", ticket.record.entity_id);
        self.schedule_stop_sequence(&ticket, triggered_at);
        
        Ok(ticket.record)
    }
    
    /// Deadlines are fixed at the trigger instant; a task that starts late
    /// only sleeps for what remains.
    fn schedule_stop_sequence(&self, ticket: &StopTicket, triggered_at: Duration) {
        let cancel_stale = self.config.cancel_stale_stop_timers;
        
        for (phase, delay) in self.config.stop_schedule.phases() {
            let deadline = triggered_at.saturating_add(delay);
            let context = Arc::clone(&self.context);
            let shared = Arc::clone(&self.shared);
            let ticket = ticket.clone();
            
            self.context.spawn("stop-sequence", async move {
                let remaining = deadline.saturating_sub(context.now());
                context.sleep(remaining).await;
                shared.fire_stop_phase(&ticket, phase, cancel_stale);
            });
        }
    }
    
    /// Current composite state.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock().snapshot()
    }
    
    /// Registers an observer; its queue starts with the current snapshot.
    ///
    /// Taken under the state lock so no event can slip in ahead of it.
    pub fn connect(&self) -> Subscription {
        let state = self.shared.lock();
        self.shared.hub.register(state.snapshot())
    }
    
    pub fn disconnect(&self, id: ObserverId) -> bool {
        self.shared.hub.unregister(id)
    }
    
    pub fn observer_count(&self) -> usize {
        self.shared.hub.observer_count()
    }
}
