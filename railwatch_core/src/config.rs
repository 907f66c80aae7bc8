//! Engine configuration.

use crate::collision::DEFAULT_COLLISION_THRESHOLD_KM;
use crate::stop::StopSchedule;

/// Track ids registered when nothing else is configured.
pub const DEFAULT_TRACK_IDS: [&str; 2] = ["track-up", "track-down"];

/// Configuration for a [`RailEngine`](crate::RailEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine's logical name (for logging)
    pub name: String,
    
    /// Inclusive collision threshold in km (default: 1.0)
    pub collision_threshold_km: f64,
    
    /// Offsets of the braking/stopped notifications (default: 2 s / 4 s)
    pub stop_schedule: StopSchedule,
    
    /// Per-observer queue depth before messages are dropped (default: 64)
    pub observer_queue_capacity: usize,
    
    /// Pre-registered signal tracks
    pub track_ids: Vec<String>,
    
    /// Discard deferred stop notifications superseded by a newer trigger
    /// (default: false, overlapping sequences are delivered)
    pub cancel_stale_stop_timers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "railwatch".to_string(),
            collision_threshold_km: DEFAULT_COLLISION_THRESHOLD_KM,
            stop_schedule: StopSchedule::default(),
            observer_queue_capacity: 64,
            track_ids: DEFAULT_TRACK_IDS.iter().map(|s| s.to_string()).collect(),
            cancel_stale_stop_timers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    
    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.collision_threshold_km, 1.0);
        assert_eq!(config.stop_schedule.braking_after, Duration::from_secs(2));
        assert_eq!(config.stop_schedule.stopped_after, Duration::from_secs(4));
        assert_eq!(config.track_ids, vec!["track-up", "track-down"]);
        assert!(!config.cancel_stale_stop_timers);
    }
}
