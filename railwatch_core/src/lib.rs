//! Railwatch Core - live rail state synchronization and alerting
//!
//! The engine keeps one consistent picture of a tracked vehicle and its
//! surroundings and pushes every change to connected observers:
//! 1. **Position**: last GPS fix resolved to the nearest catalog waypoint
//! 2. **Signals**: three-aspect signals per track side, advanced one step per command
//! 3. **Collision**: inclusive 1 km distance risk flag
//! 4. **Emergency stop**: last-write-wins record with a braking/stopped timeline
//!
//! All mutations are serialized inside [`RailEngine`]; fan-out goes through
//! the [`BroadcastHub`].

pub mod catalog;
pub mod collision;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geo;
pub mod hub;
pub mod position;
pub mod signals;
pub mod stop;

// Re-export key types for convenience
pub use catalog::{Waypoint, WaypointCatalog};
pub use collision::{CollisionAssessment, CollisionEvaluator};
pub use commands::{PositionCommand, SignalCommand, StopCommand};
pub use config::EngineConfig;
pub use engine::{PositionReport, RailEngine};
pub use error::{CatalogError, CoreError};
pub use events::{PushMessage, RailEvent, Snapshot};
pub use geo::{distance_km, Coordinate};
pub use hub::{BroadcastHub, DeliveryReport, Subscription};
pub use position::{NearestWaypoint, PositionFix};
pub use signals::{Level, Side, SignalPair, SignalTable};
pub use stop::{StopPhase, StopRecord, StopSchedule};
