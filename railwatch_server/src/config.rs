//! Command-line and environment configuration.

use clap::Parser;
use railwatch_core::{CatalogError, EngineConfig, StopSchedule, WaypointCatalog};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "railwatch-server")]
#[command(about = "Live rail position, signal and emergency-stop server")]
pub struct ServerArgs {
    /// Interface to bind
    #[arg(long, env = "RAILWATCH_HOST", default_value = "0.0.0.0")]
    pub host: String,
    
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    
    /// JSON waypoint catalog (defaults to the built-in Coimbatore corridor)
    #[arg(long, env = "RAILWATCH_CATALOG")]
    pub catalog: Option<PathBuf>,
    
    /// Comma-separated signal track ids
    #[arg(
        long,
        env = "RAILWATCH_TRACKS",
        value_delimiter = ',',
        default_value = "track-up,track-down"
    )]
    pub tracks: Vec<String>,
    
    /// Inclusive collision threshold in km
    #[arg(long, env = "RAILWATCH_COLLISION_KM", default_value_t = 1.0)]
    pub collision_threshold_km: f64,
    
    /// Per-observer queue depth
    #[arg(long, env = "RAILWATCH_QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,
    
    /// Braking notification delay in milliseconds
    #[arg(long, env = "RAILWATCH_BRAKING_MS", default_value_t = 2000)]
    pub braking_ms: u64,
    
    /// Stopped notification delay in milliseconds
    #[arg(long, env = "RAILWATCH_STOPPED_MS", default_value_t = 4000)]
    pub stopped_ms: u64,
    
    /// Drop stop notifications superseded by a newer trigger
    #[arg(long, env = "RAILWATCH_CANCEL_STALE_STOPS")]
    pub cancel_stale_stop_timers: bool,
}

impl ServerArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
    
    /// Fails if the stopped notice would precede the braking notice.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        if self.stopped_ms < self.braking_ms {
            anyhow::bail!(
                "stopped delay ({} ms) must not be shorter than braking delay ({} ms)",
                self.stopped_ms,
                self.braking_ms
            );
        }
        
        let defaults = EngineConfig::default();
        let tracks: Vec<String> = self
            .tracks
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        
        Ok(EngineConfig {
            collision_threshold_km: self.collision_threshold_km,
            observer_queue_capacity: self.queue_capacity,
            stop_schedule: StopSchedule {
                braking_after: Duration::from_millis(self.braking_ms),
                stopped_after: Duration::from_millis(self.stopped_ms),
            },
            cancel_stale_stop_timers: self.cancel_stale_stop_timers,
            track_ids: if tracks.is_empty() { defaults.track_ids.clone() } else { tracks },
            ..defaults
        })
    }
    
    pub fn load_catalog(&self) -> Result<WaypointCatalog, CatalogError> {
        match &self.catalog {
            Some(path) => WaypointCatalog::load(path),
            None => Ok(WaypointCatalog::coimbatore()),
        }
    }
}
