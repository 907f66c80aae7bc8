//! Ground truth oracle for simulation.
//!
//! The Oracle generates seeded inputs around the catalog and answers
//! nearest-waypoint queries by brute force, independent of the engine.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use railwatch_core::{distance_km, Coordinate, Side, WaypointCatalog};

/// Max offset (degrees) of generated fixes from their anchor waypoint
const JITTER_DEG: f64 = 0.05;

/// Reference answer for one fix.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedNearest {
    /// Catalog position of the winning waypoint
    pub index: usize,
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
    pub risk: bool,
}

/// Seeded input generator and reference model.
pub struct Oracle {
    rng: ChaCha8Rng,
    catalog: WaypointCatalog,
    threshold_km: f64,
}

impl Oracle {
    pub fn new(seed: u64, catalog: WaypointCatalog, threshold_km: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            catalog,
            threshold_km,
        }
    }
    
    /// A fix near a random waypoint.
    pub fn random_fix(&mut self) -> Coordinate {
        let anchor = self.rng.gen_range(0..self.catalog.len());
        let base = self
            .catalog
            .iter()
            .nth(anchor)
            .map(|w| w.coordinate())
            .unwrap_or_else(|| self.catalog.first().coordinate());
        
        Coordinate::new(
            (base.lat + self.rng.gen_range(-JITTER_DEG..=JITTER_DEG)).clamp(-90.0, 90.0),
            (base.lng + self.rng.gen_range(-JITTER_DEG..=JITTER_DEG)).clamp(-180.0, 180.0),
        )
    }
    
    pub fn random_side(&mut self) -> Side {
        if self.rng.gen_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        }
    }
    
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.rng.gen_range(0..items.len()))
    }
    
    /// Uniform index into a collection of `len` items.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }
    
    pub fn gap_ms(&mut self, max_ms: u64) -> u64 {
        self.rng.gen_range(0..=max_ms)
    }
    
    /// Brute-force nearest waypoint; ties keep the earliest entry.
    pub fn expected_nearest(&self, fix: Coordinate) -> Option<ExpectedNearest> {
        let distances: Vec<f64> = self
            .catalog
            .iter()
            .map(|w| distance_km(fix, w.coordinate()))
            .collect();
        
        let best = distances
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let index = distances.iter().position(|d| *d == best)?;
        let waypoint = self.catalog.iter().nth(index)?;
        
        Some(ExpectedNearest {
            index,
            id: waypoint.id.clone(),
            name: waypoint.name.clone(),
            lat: waypoint.lat,
            lng: waypoint.lng,
            distance_km: best,
            risk: best <= self.threshold_km,
        })
    }
    
    pub fn catalog(&self) -> &WaypointCatalog {
        &self.catalog
    }
}
