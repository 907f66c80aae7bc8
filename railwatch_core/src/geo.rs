//! Distance Resolver - great-circle distance on a spherical earth.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Mean earth radius used by the haversine formula (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
    
    /// Builds a coordinate from untrusted input.
    ///
    /// Rejects non-finite values and values outside ±90° latitude or
    /// ±180° longitude.
    pub fn checked(lat: f64, lng: f64) -> Result<Self, CoreError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(CoreError::invalid_input("lat and lng must be finite numbers"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoreError::invalid_input(format!("lat {lat} out of range")));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::invalid_input(format!("lng {lng} out of range")));
        }
        Ok(Self { lat, lng })
    }
}

/// Haversine distance between two coordinates in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    
    #[test]
    fn test_zero_distance() {
        let p = Coordinate::new(11.018, 76.970);
        assert_eq!(distance_km(p, p), 0.0);
    }
    
    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
        // 2πR / 360
        assert_relative_eq!(d, 111.194_926_6, epsilon = 1e-6);
    }
    
    #[test]
    fn test_symmetric() {
        let a = Coordinate::new(11.018, 76.970);
        let b = Coordinate::new(10.974, 76.933);
        assert_relative_eq!(distance_km(a, b), distance_km(b, a), epsilon = 1e-12);
    }
    
    #[test]
    fn test_coimbatore_to_podanur() {
        let cbe = Coordinate::new(11.018, 76.970);
        let ptj = Coordinate::new(10.974, 76.933);
        let d = distance_km(cbe, ptj);
        assert!(d > 6.0 && d < 6.5, "got {d}");
    }
    
    #[test]
    fn test_checked_rejects_bad_input() {
        assert!(Coordinate::checked(f64::NAN, 0.0).is_err());
        assert!(Coordinate::checked(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::checked(90.5, 0.0).is_err());
        assert!(Coordinate::checked(0.0, -180.5).is_err());
        assert!(Coordinate::checked(-90.0, 180.0).is_ok());
    }
}
