//! Fundamental coordinate and time types.

use serde::{Deserialize, Serialize};

/// Simulated seconds since the run origin. Always non-decreasing along a
/// particle's chain, for forward and reverse runs alike.
pub type SimSecs = i64;

/// Reference (wall-clock) seconds, e.g. Unix time. Environment data and the
/// particle archive are indexed by reference time.
pub type RefSecs = i64;

/// Geodetic position in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Longitude wrapped into [-180, 180).
    pub fn normalized(self) -> Self {
        let lng = (self.lng + 180.0).rem_euclid(360.0) - 180.0;
        Self { lat: self.lat, lng }
    }

    /// Position quantized to micro-degrees; used as a dedup key.
    pub fn quantized(&self) -> (i64, i64) {
        (
            (self.lat * 1.0e6).round() as i64,
            (self.lng * 1.0e6).round() as i64,
        )
    }
}

impl From<[f64; 2]> for LatLng {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}
