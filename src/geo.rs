//! Geofence check for reported positions.
//!
//! A report is plausible when it is a valid coordinate and lies within the
//! configured radius of the deployment center, measured along the great
//! circle (haversine).

/// Mean earth radius in miles (6371.0088 km).
pub const EARTH_RADIUS_MILES: f64 = 3958.7613;

/// Great-circle distance between two `(lat, lon)` points in miles.
pub fn haversine_miles(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeofenceRejection {
    /// Latitude or longitude outside the valid range (or NaN).
    InvalidPosition,
    /// Further than the configured radius.
    TooFar { distance: f64 },
}

impl std::fmt::Display for GeofenceRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeofenceRejection::InvalidPosition => write!(f, "invalid position"),
            GeofenceRejection::TooFar { distance } => {
                write!(f, "distance {:.2} mi exceeds max distance", distance)
            }
        }
    }
}

/// Center point plus maximum radius in miles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: (f64, f64),
    pub max_distance_miles: f64,
}

impl Geofence {
    pub fn new(center: (f64, f64), max_distance_miles: f64) -> Self {
        Self {
            center,
            max_distance_miles,
        }
    }

    /// Accept a point, returning its distance from the center.
    pub fn check(&self, lat: f64, lon: f64) -> Result<f64, GeofenceRejection> {
        if !is_valid_coordinate(lat, lon) {
            return Err(GeofenceRejection::InvalidPosition);
        }
        let distance = haversine_miles(self.center, (lat, lon));
        if distance > self.max_distance_miles {
            return Err(GeofenceRejection::TooFar { distance });
        }
        Ok(distance)
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.check(lat, lon).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEATTLE: (f64, f64) = (47.6062, -122.3321);

    #[test]
    fn center_is_accepted_at_distance_zero() {
        let fence = Geofence::new(SEATTLE, 10.0);
        assert_eq!(fence.check(SEATTLE.0, SEATTLE.1), Ok(0.0));
        assert!(Geofence::new(SEATTLE, 0.0).contains(SEATTLE.0, SEATTLE.1));
    }

    #[test]
    fn known_distance_is_close() {
        // Seattle to Portland is roughly 145 miles.
        let d = haversine_miles(SEATTLE, (45.5152, -122.6784));
        assert!((d - 145.0).abs() < 2.0, "got {d}");
    }

    #[test]
    fn point_just_beyond_radius_is_rejected() {
        // One degree of latitude is ~69.09 miles.
        let one_degree = haversine_miles((0.0, 0.0), (1.0, 0.0));
        let fence = Geofence::new((0.0, 0.0), one_degree);
        assert!(fence.contains(1.0, 0.0));

        let fence = Geofence::new((0.0, 0.0), one_degree - 1e-6);
        match fence.check(1.0, 0.0) {
            Err(GeofenceRejection::TooFar { distance }) => assert_eq!(distance, one_degree),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let fence = Geofence::new((0.0, 0.0), 1e9);
        assert_eq!(fence.check(90.5, 0.0), Err(GeofenceRejection::InvalidPosition));
        assert_eq!(fence.check(0.0, -180.01), Err(GeofenceRejection::InvalidPosition));
        assert_eq!(fence.check(f64::NAN, 0.0), Err(GeofenceRejection::InvalidPosition));
        assert!(fence.contains(-90.0, 180.0));
    }
}
