//! State vectors: one sample of a particle's trajectory.
//!
//! A particle's chain is an append-only arena of these. The kind tag selects
//! how the next sample is computed: underway samples follow the itinerary,
//! distress samples drift.

use serde::{Deserialize, Serialize};

use seadrift_core::enums::{DriftState, StateVectorType};
use seadrift_core::types::{LatLng, SimSecs};

/// Autocorrelated perturbation carried from one distress sample to the
/// next. `None` until the first draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistressNoise {
    pub sea_east: Option<f32>,
    pub sea_north: Option<f32>,
    pub wind_east: Option<f32>,
    pub wind_north: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StateVectorKind {
    Underway,
    Distress(DistressNoise),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub time: SimSecs,
    pub position: LatLng,
    /// Reporting classification of the sample.
    pub svt: StateVectorType,
    pub stuck_on_land: bool,
    pub anchored: bool,
    pub kind: StateVectorKind,
}

impl StateVector {
    /// Sample of a particle still following its itinerary.
    pub fn underway(time: SimSecs, position: LatLng) -> Self {
        Self {
            time,
            position,
            svt: StateVectorType::Underway,
            stuck_on_land: false,
            anchored: false,
            kind: StateVectorKind::Underway,
        }
    }

    /// First distress sample: no noise history yet.
    pub fn distress(time: SimSecs, position: LatLng) -> Self {
        Self {
            time,
            position,
            svt: StateVectorType::Distress,
            stuck_on_land: false,
            anchored: false,
            kind: StateVectorKind::Distress(DistressNoise::default()),
        }
    }

    /// Physics state derived from the kind and the flags.
    pub fn drift_state(&self) -> DriftState {
        match self.kind {
            StateVectorKind::Underway => DriftState::Underway,
            StateVectorKind::Distress(_) if self.anchored => DriftState::Anchored,
            StateVectorKind::Distress(_) if self.stuck_on_land => DriftState::StuckOnLand,
            StateVectorKind::Distress(_) => DriftState::AdriftMoving,
        }
    }

    /// Stuck on land or anchored.
    pub fn is_frozen(&self) -> bool {
        self.drift_state().is_frozen()
    }

    /// Noise carried by a distress sample.
    pub fn noise(&self) -> Option<DistressNoise> {
        match self.kind {
            StateVectorKind::Distress(noise) => Some(noise),
            StateVectorKind::Underway => None,
        }
    }

    /// Copy of this sample at a later time: same position, flags and noise.
    pub fn frozen_at(&self, time: SimSecs) -> Self {
        Self { time, ..*self }
    }

    /// Drifted successor at `time`. Flags are recomputed by the caller.
    pub fn moved_to(&self, time: SimSecs, position: LatLng, noise: DistressNoise) -> Self {
        Self {
            time,
            position,
            svt: StateVectorType::Distress,
            stuck_on_land: false,
            anchored: false,
            kind: StateVectorKind::Distress(noise),
        }
    }

    /// Ground the sample; reported as landed.
    pub fn mark_stuck(&mut self) {
        self.stuck_on_land = true;
        self.svt = StateVectorType::Landed;
    }

    /// Anchor the sample; reported as anchored.
    pub fn mark_anchored(&mut self) {
        self.anchored = true;
        self.svt = StateVectorType::Anchored;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_states() {
        let p = LatLng::new(0.0, 0.0);
        assert_eq!(StateVector::underway(0, p).drift_state(), DriftState::Underway);

        let mut sv = StateVector::distress(10, p);
        assert_eq!(sv.drift_state(), DriftState::AdriftMoving);
        sv.mark_stuck();
        assert_eq!(sv.drift_state(), DriftState::StuckOnLand);
        assert_eq!(sv.svt, StateVectorType::Landed);
        assert!(sv.is_frozen());

        let mut anchored = StateVector::distress(10, p);
        anchored.mark_anchored();
        assert_eq!(anchored.drift_state(), DriftState::Anchored);
    }

    #[test]
    fn test_frozen_copy_keeps_everything_but_time() {
        let mut sv = StateVector::distress(10, LatLng::new(1.0, 2.0));
        sv.kind = StateVectorKind::Distress(DistressNoise {
            sea_east: Some(0.5),
            ..Default::default()
        });
        sv.mark_stuck();
        let next = sv.frozen_at(70);
        assert_eq!(next.time, 70);
        assert_eq!(next.position, sv.position);
        assert_eq!(next.kind, sv.kind);
        assert!(next.stuck_on_land);
    }
}
