use serde::{Deserialize, Serialize};

/// A GPS coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lon >= -180.0
            && self.lon <= 180.0
    }
}

/// One raw position report from the inbound feed. Ephemeral: the tracker
/// keeps only the previously applied report for direction inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    pub vehicle_id: String,
    pub lat: f64,
    pub lon: f64,
    pub speed_kmh: Option<f64>,
    pub heading_degrees: Option<f64>,
    /// Unix seconds.
    pub timestamp: u64,
}

impl PositionReport {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latlon_validation() {
        assert!(LatLon::new(51.5074, -0.1278).is_valid());
        assert!(!LatLon::new(91.0, 0.0).is_valid());
        assert!(!LatLon::new(0.0, 181.0).is_valid());
        assert!(!LatLon::new(f64::NAN, 0.0).is_valid());
    }
}
