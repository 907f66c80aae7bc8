//! Collision Evaluator - distance threshold risk flag.

use crate::geo::{distance_km, Coordinate};
use serde::{Deserialize, Serialize};

/// Default collision threshold (km). Inclusive.
pub const DEFAULT_COLLISION_THRESHOLD_KM: f64 = 1.0;

/// Stateless evaluator: `risk = distance_km <= threshold_km`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvaluator {
    threshold_km: f64,
}

/// Result of evaluating two entities against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionAssessment {
    pub distance_km: f64,
    pub risk: bool,
}

impl CollisionEvaluator {
    pub fn new(threshold_km: f64) -> Self {
        Self { threshold_km }
    }
    
    pub fn threshold_km(&self) -> f64 {
        self.threshold_km
    }
    
    pub fn is_risk(&self, distance_km: f64) -> bool {
        distance_km <= self.threshold_km
    }
    
    /// Evaluates the inter-entity distance between two positions.
    pub fn assess(&self, a: Coordinate, b: Coordinate) -> CollisionAssessment {
        let distance_km = distance_km(a, b);
        CollisionAssessment {
            distance_km,
            risk: self.is_risk(distance_km),
        }
    }
}

impl Default for CollisionEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_COLLISION_THRESHOLD_KM)
    }
}
