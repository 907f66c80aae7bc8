//! Position Tracker - last known fix plus its resolved nearest waypoint.

use crate::catalog::{Waypoint, WaypointCatalog};
use crate::collision::CollisionEvaluator;
use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Last reported position of the tracked vehicle.
pub type PositionFix = Coordinate;

/// The catalog waypoint closest to the current fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestWaypoint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub distance_km: f64,
    pub lat: f64,
    pub lng: f64,
    /// Collision flag derived from `distance_km`
    pub risk: bool,
}

impl NearestWaypoint {
    fn from_waypoint(waypoint: &Waypoint, distance_km: f64, evaluator: &CollisionEvaluator) -> Self {
        Self {
            name: waypoint.name.clone(),
            code: (!waypoint.code.is_empty()).then(|| waypoint.code.clone()),
            distance_km,
            lat: waypoint.lat,
            lng: waypoint.lng,
            risk: evaluator.is_risk(distance_km),
        }
    }
}

/// Resolves `position` against the catalog.
pub fn resolve_nearest(
    catalog: &WaypointCatalog,
    position: Coordinate,
    evaluator: &CollisionEvaluator,
) -> NearestWaypoint {
    let (waypoint, distance) = catalog.nearest(position);
    NearestWaypoint::from_waypoint(waypoint, distance, evaluator)
}

/// Holds exactly one fix and one nearest result; both are replaced together.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    catalog: Arc<WaypointCatalog>,
    evaluator: CollisionEvaluator,
    fix: PositionFix,
    nearest: NearestWaypoint,
}

impl PositionTracker {
    /// Starts parked on the first catalog waypoint.
    pub fn new(catalog: Arc<WaypointCatalog>, evaluator: CollisionEvaluator) -> Self {
        let fix = catalog.first().coordinate();
        let nearest = resolve_nearest(&catalog, fix, &evaluator);
        Self {
            catalog,
            evaluator,
            fix,
            nearest,
        }
    }
    
    pub fn fix(&self) -> PositionFix {
        self.fix
    }
    
    pub fn nearest(&self) -> &NearestWaypoint {
        &self.nearest
    }
    
    /// Replaces the fix and recomputes the nearest waypoint.
    ///
    /// The coordinate must already be validated; the resolution itself
    /// cannot fail.
    pub fn update(&mut self, fix: PositionFix) -> (PositionFix, NearestWaypoint) {
        let nearest = resolve_nearest(&self.catalog, fix, &self.evaluator);
        self.fix = fix;
        self.nearest = nearest.clone();
        (fix, nearest)
    }
}
