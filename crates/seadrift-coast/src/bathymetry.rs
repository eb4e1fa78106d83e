//! Water depth lookups used by the anchoring test.

use seadrift_core::types::LatLng;

pub trait Bathymetry: Send + Sync {
    /// Depth in meters (positive down), `None` where unknown.
    fn depth_m(&self, point: LatLng) -> Option<f64>;
}

/// Same depth everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantDepth(pub f64);

impl Bathymetry for ConstantDepth {
    fn depth_m(&self, _point: LatLng) -> Option<f64> {
        Some(self.0)
    }
}

/// No depth data; nothing can anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBathymetry;

impl Bathymetry for NoBathymetry {
    fn depth_m(&self, _point: LatLng) -> Option<f64> {
        None
    }
}
