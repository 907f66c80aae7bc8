//! Waypoint Catalog - the fixed table of known reference points.
//!
//! The catalog is built once at start-up and never mutated. Insertion
//! order is significant: nearest-waypoint resolution breaks exact ties in
//! favour of the earlier entry.

use crate::error::CatalogError;
use crate::geo::{distance_km, Coordinate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A fixed, named reference coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub name: String,
    pub code: String,
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub fn new(id: &str, name: &str, code: &str, lat: f64, lng: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            code: code.to_string(),
            lat,
            lng,
        }
    }
    
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// On-disk record shape: coordinates nested the way the station data
/// files keep them. Flat `lat`/`lng` records are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WaypointRecord {
    Nested {
        id: String,
        name: String,
        #[serde(default)]
        code: String,
        coordinates: Coordinate,
    },
    Flat(Waypoint),
}

impl From<WaypointRecord> for Waypoint {
    fn from(record: WaypointRecord) -> Self {
        match record {
            WaypointRecord::Nested { id, name, code, coordinates } => Waypoint {
                id,
                name,
                code,
                lat: coordinates.lat,
                lng: coordinates.lng,
            },
            WaypointRecord::Flat(waypoint) => waypoint,
        }
    }
}

/// Immutable, non-empty, id-unique list of waypoints.
#[derive(Debug, Clone)]
pub struct WaypointCatalog {
    waypoints: Vec<Waypoint>,
}

impl WaypointCatalog {
    /// Validates and wraps a list of waypoints.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, CatalogError> {
        if waypoints.is_empty() {
            return Err(CatalogError::Empty);
        }
        
        let mut seen = HashSet::new();
        for waypoint in &waypoints {
            if !seen.insert(waypoint.id.as_str()) {
                return Err(CatalogError::DuplicateId(waypoint.id.clone()));
            }
            if Coordinate::checked(waypoint.lat, waypoint.lng).is_err() {
                return Err(CatalogError::InvalidCoordinate(waypoint.id.clone()));
            }
        }
        
        Ok(Self { waypoints })
    }
    
    /// The Coimbatore corridor served by the default deployment.
    pub fn coimbatore() -> Self {
        Self {
            waypoints: vec![
                Waypoint::new("cbe", "Coimbatore Junction", "CBE", 11.018, 76.970),
                Waypoint::new("cbf", "Coimbatore North Junction", "CBF", 11.039, 76.983),
                Waypoint::new("ptj", "Podanur Junction", "PTJ", 10.974, 76.933),
                Waypoint::new("shi", "Singanallur", "SHI", 11.005, 76.991),
            ],
        }
    }
    
    /// Parses a JSON array of waypoint records.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<WaypointRecord> = serde_json::from_str(json)?;
        Self::new(records.into_iter().map(Waypoint::from).collect())
    }
    
    /// Loads a catalog file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
    
    /// The first registered waypoint (default position at start-up).
    pub fn first(&self) -> &Waypoint {
        // Non-empty is enforced by every constructor
        &self.waypoints[0]
    }
    
    pub fn get(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }
    
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }
    
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
    
    /// Linear scan for the closest waypoint.
    ///
    /// Strict less-than: on an exact tie the earliest waypoint wins.
    pub fn nearest(&self, position: Coordinate) -> (&Waypoint, f64) {
        let mut best = self.first();
        let mut best_distance = distance_km(position, best.coordinate());
        
        for waypoint in self.waypoints.iter().skip(1) {
            let d = distance_km(position, waypoint.coordinate());
            if d < best_distance {
                best = waypoint;
                best_distance = d;
            }
        }
        
        (best, best_distance)
    }
}

impl Default for WaypointCatalog {
    fn default() -> Self {
        Self::coimbatore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    fn two_point_catalog() -> WaypointCatalog {
        WaypointCatalog::new(vec![
            Waypoint::new("w1", "W1", "W1", 0.0, 0.0),
            Waypoint::new("w2", "W2", "W2", 0.0, 1.0),
        ])
        .unwrap()
    }
    
    #[test]
    fn test_nearest_picks_closer_waypoint() {
        let catalog = two_point_catalog();
        assert_eq!(catalog.nearest(Coordinate::new(0.0, 0.6)).0.id, "w2");
        assert_eq!(catalog.nearest(Coordinate::new(0.0, 0.4)).0.id, "w1");
    }
    
    #[test]
    fn test_exact_tie_goes_to_first_registered() {
        let catalog = WaypointCatalog::new(vec![
            Waypoint::new("a", "A", "A", 1.0, 1.0),
            Waypoint::new("b", "B", "B", 1.0, 1.0),
        ])
        .unwrap();
        
        let (nearest, _) = catalog.nearest(Coordinate::new(2.0, 2.0));
        assert_eq!(nearest.id, "a");
    }
    
    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(matches!(WaypointCatalog::new(vec![]), Err(CatalogError::Empty)));
        
        let dup = WaypointCatalog::new(vec![
            Waypoint::new("a", "A", "A", 0.0, 0.0),
            Waypoint::new("a", "A2", "A2", 1.0, 1.0),
        ]);
        assert!(matches!(dup, Err(CatalogError::DuplicateId(id)) if id == "a"));
    }
    
    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let bad = WaypointCatalog::new(vec![Waypoint::new("x", "X", "X", 91.0, 0.0)]);
        assert!(matches!(bad, Err(CatalogError::InvalidCoordinate(_))));
    }
    
    #[test]
    fn test_parses_nested_station_records() {
        let json = r#"[
            { "id": "cbe", "name": "Coimbatore Junction", "code": "CBE",
              "coordinates": { "lat": 11.018, "lng": 76.970 } },
            { "id": "shi", "name": "Singanallur", "code": "SHI", "lat": 11.005, "lng": 76.991 }
        ]"#;
        
        let catalog = WaypointCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.first().code, "CBE");
        assert_eq!(catalog.get("shi").map(|w| w.lng), Some(76.991));
    }
    
    #[test]
    fn test_default_is_coimbatore() {
        let catalog = WaypointCatalog::default();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.first().id, "cbe");
        // Validation passes for the built-in table
        assert!(WaypointCatalog::new(catalog.iter().cloned().collect()).is_ok());
    }
}
