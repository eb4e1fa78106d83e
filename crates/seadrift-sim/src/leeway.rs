//! Leeway: the drift of an object relative to the water, caused by wind.
//!
//! Each particle draws its regression errors and jibe side once, from its
//! "leeway" sub-stream, and keeps them for the whole run.

use glam::DVec2;
use rand::Rng;
use rand_distr::StandardNormal;

use seadrift_coast::Bathymetry;
use seadrift_core::config::{LeewayParams, ObjectTypeConfig};
use seadrift_core::types::LatLng;

/// Per-object-type behaviour looked up by the physics.
pub trait LeewayProvider: Send + Sync {
    fn params(&self, object_type: usize) -> LeewayParams;

    fn is_sticky(&self, object_type: usize) -> bool;

    /// Mean survival after distress (hours), if the type expires.
    fn survival_hours(&self, object_type: usize) -> Option<f64>;

    /// Anchoring test on entering distress. `draw` is uniform in [0, 1).
    fn anchors(
        &self,
        object_type: usize,
        position: LatLng,
        draw: f64,
        bathymetry: &dyn Bathymetry,
    ) -> bool;
}

/// Object types from the run configuration, indexed by ordinal.
#[derive(Debug, Clone, Default)]
pub struct ObjectCatalog {
    types: Vec<ObjectTypeConfig>,
}

impl ObjectCatalog {
    pub fn new(types: Vec<ObjectTypeConfig>) -> Self {
        Self { types }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn name(&self, object_type: usize) -> Option<&str> {
        self.types.get(object_type).map(|t| t.name.as_str())
    }
}

impl LeewayProvider for ObjectCatalog {
    fn params(&self, object_type: usize) -> LeewayParams {
        self.types
            .get(object_type)
            .map(|t| t.leeway)
            .unwrap_or_default()
    }

    fn is_sticky(&self, object_type: usize) -> bool {
        self.types.get(object_type).is_some_and(|t| t.sticky)
    }

    fn survival_hours(&self, object_type: usize) -> Option<f64> {
        self.types.get(object_type).and_then(|t| t.survival_hours)
    }

    fn anchors(
        &self,
        object_type: usize,
        position: LatLng,
        draw: f64,
        bathymetry: &dyn Bathymetry,
    ) -> bool {
        let Some(anchoring) = self.types.get(object_type).and_then(|t| t.anchoring) else {
            return false;
        };
        match bathymetry.depth_m(position) {
            Some(depth) => depth <= anchoring.max_depth_m && draw < anchoring.probability,
            None => false,
        }
    }
}

/// A particle's fixed leeway behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeewayResponse {
    params: LeewayParams,
    downwind_error: f64,
    crosswind_error: f64,
    /// +1 right of downwind, -1 left, 0 for mean particles.
    crosswind_sign: f64,
}

impl LeewayResponse {
    /// Draw the errors and jibe side: downwind normal, crosswind normal,
    /// then one uniform for the side.
    pub fn draw<R: Rng>(params: LeewayParams, rng: &mut R) -> Self {
        let dw: f64 = rng.sample(StandardNormal);
        let cw: f64 = rng.sample(StandardNormal);
        let side: f64 = rng.gen();
        Self {
            params,
            downwind_error: dw * params.downwind_sd,
            crosswind_error: cw * params.crosswind_sd,
            crosswind_sign: if side < 0.5 { -1.0 } else { 1.0 },
        }
    }

    /// Response of the environmental mean: no errors, no crosswind side.
    pub fn mean(params: LeewayParams) -> Self {
        Self {
            params,
            downwind_error: 0.0,
            crosswind_error: 0.0,
            crosswind_sign: 0.0,
        }
    }

    pub fn crosswind_sign(&self) -> f64 {
        self.crosswind_sign
    }

    /// Leeway velocity (knots, east/north) for a wind vector (knots).
    pub fn velocity(&self, wind: DVec2) -> DVec2 {
        let speed = wind.length();
        if speed < 1.0e-12 {
            return DVec2::ZERO;
        }
        let p = &self.params;
        let down = wind / speed;
        let cross = DVec2::new(down.y, -down.x);

        let dwl = (p.downwind_slope * speed + p.downwind_intercept + self.downwind_error).max(0.0);
        let cwl = self.crosswind_sign
            * (p.crosswind_slope * speed + p.crosswind_intercept + self.crosswind_error);
        down * dwl + cross * cwl
    }
}
