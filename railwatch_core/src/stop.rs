//! Stop Controller - emergency-stop record and its notification timeline.
//!
//! A trigger overwrites the single active [`StopRecord`] (last write wins)
//! and hands back a [`StopTicket`]. The engine turns the ticket into two
//! deferred notifications using the [`StopSchedule`].

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The active emergency stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRecord {
    pub entity_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Deferred stages after the initial stop command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopPhase {
    /// Brakes applied, vehicle slowing
    Braking,
    /// Vehicle at standstill
    Stopped,
}

/// Offsets of each deferred stage relative to the trigger instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopSchedule {
    pub braking_after: Duration,
    pub stopped_after: Duration,
}

impl StopSchedule {
    pub fn phases(&self) -> [(StopPhase, Duration); 2] {
        [
            (StopPhase::Braking, self.braking_after),
            (StopPhase::Stopped, self.stopped_after),
        ]
    }
}

impl Default for StopSchedule {
    fn default() -> Self {
        Self {
            braking_after: Duration::from_secs(2),
            stopped_after: Duration::from_secs(4),
        }
    }
}

/// Handle for one trigger: the record plus its generation number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTicket {
    pub record: StopRecord,
    pub generation: u64,
}

/// Owns the at-most-one active [`StopRecord`].
#[derive(Debug, Clone, Default)]
pub struct StopController {
    active: Option<StopRecord>,
    generation: u64,
}

impl StopController {
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Overwrites the active record.
    ///
    /// An empty (or whitespace-only) entity id is rejected and leaves the
    /// previous record in place.
    pub fn trigger(&mut self, entity_id: &str, issued_at: DateTime<Utc>) -> Result<StopTicket, CoreError> {
        let entity_id = entity_id.trim();
        if entity_id.is_empty() {
            return Err(CoreError::invalid_input("Missing trainId"));
        }
        
        let record = StopRecord {
            entity_id: entity_id.to_string(),
            issued_at,
        };
        self.generation += 1;
        self.active = Some(record.clone());
        
        Ok(StopTicket {
            record,
            generation: self.generation,
        })
    }
    
    pub fn active(&self) -> Option<&StopRecord> {
        self.active.as_ref()
    }
    
    pub fn generation(&self) -> u64 {
        self.generation
    }
    
    /// True if no trigger happened after the one that produced `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    
    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
    }
    
    #[test]
    fn test_last_write_wins() {
        let mut controller = StopController::new();
        controller.trigger("train-a", at(0)).unwrap();
        let second = controller.trigger("train-b", at(5)).unwrap();
        
        let active = controller.active().unwrap();
        assert_eq!(active.entity_id, "train-b");
        assert_eq!(active.issued_at, at(5));
        assert_eq!(second.generation, 2);
    }
    
    #[test]
    fn test_empty_entity_rejected_without_side_effects() {
        let mut controller = StopController::new();
        controller.trigger("train-a", at(0)).unwrap();
        
        assert!(matches!(controller.trigger("  ", at(1)), Err(CoreError::InvalidInput(_))));
        assert_eq!(controller.active().unwrap().entity_id, "train-a");
        assert_eq!(controller.generation(), 1);
    }
    
    #[test]
    fn test_generation_tracks_latest_trigger() {
        let mut controller = StopController::new();
        let first = controller.trigger("train-a", at(0)).unwrap();
        assert!(controller.is_current(first.generation));
        
        controller.trigger("train-a", at(1)).unwrap();
        assert!(!controller.is_current(first.generation));
    }
    
    #[test]
    fn test_default_schedule() {
        let phases = StopSchedule::default().phases();
        assert_eq!(phases[0], (StopPhase::Braking, Duration::from_secs(2)));
        assert_eq!(phases[1], (StopPhase::Stopped, Duration::from_secs(4)));
    }
}
