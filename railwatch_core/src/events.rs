//! Change events and snapshots pushed to observers.

use crate::position::{NearestWaypoint, PositionFix};
use crate::signals::SignalTable;
use crate::stop::{StopPhase, StopRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A state change, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RailEvent {
    /// New fix and its resolved nearest waypoint
    LocationUpdate {
        lat: f64,
        lng: f64,
        nearest: NearestWaypoint,
    },
    
    /// Full signal table after an advance
    SignalUpdate { signals: SignalTable },
    
    /// Emergency stop accepted
    EmergencyStop {
        entity_id: String,
        issued_at: DateTime<Utc>,
    },
    
    /// Deferred stage of a stop sequence; `issued_at` names the trigger
    StopProgress {
        entity_id: String,
        phase: StopPhase,
        issued_at: DateTime<Utc>,
    },
}

impl RailEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RailEvent::LocationUpdate { .. } => "LOCATION_UPDATE",
            RailEvent::SignalUpdate { .. } => "SIGNAL_UPDATE",
            RailEvent::EmergencyStop { .. } => "EMERGENCY_STOP",
            RailEvent::StopProgress { .. } => "STOP_PROGRESS",
        }
    }
}

impl From<&StopRecord> for RailEvent {
    fn from(record: &StopRecord) -> Self {
        RailEvent::EmergencyStop {
            entity_id: record.entity_id.clone(),
            issued_at: record.issued_at,
        }
    }
}

/// Complete current state, assembled on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub position: PositionFix,
    pub nearest: NearestWaypoint,
    pub signals: SignalTable,
    pub emergency_stop: Option<StopRecord>,
}

/// What an observer queue carries.
///
/// The snapshot is sent once, unlabelled, right after connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PushMessage {
    Snapshot(Snapshot),
    Event(RailEvent),
}

impl PushMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
    
    pub fn as_event(&self) -> Option<&RailEvent> {
        match self {
            PushMessage::Event(event) => Some(event),
            PushMessage::Snapshot(_) => None,
        }
    }
    
    pub fn as_snapshot(&self) -> Option<&Snapshot> {
        match self {
            PushMessage::Snapshot(snapshot) => Some(snapshot),
            PushMessage::Event(_) => None,
        }
    }
}
