//! Enumeration types used throughout the engine.

use serde::{Deserialize, Serialize};

/// Physics state of a particle's latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriftState {
    /// Following the pre-distress itinerary.
    Underway,
    /// Adrift and free to move.
    AdriftMoving,
    /// Held on the shoreline. Position frozen.
    StuckOnLand,
    /// Anchored on entering distress. Position frozen.
    Anchored,
}

impl DriftState {
    /// Absorbing states never move again.
    pub fn is_frozen(self) -> bool {
        matches!(self, Self::StuckOnLand | Self::Anchored)
    }
}

/// Reporting-only classification of a sample (SVT). Orthogonal to the
/// physics state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateVectorType {
    #[default]
    Underway,
    Distress,
    Landed,
    Anchored,
    Expired,
    EnvironmentalMean,
}

/// Spatial/temporal interpolation used by environment lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    Nearest,
    #[default]
    Linear,
}

/// Direction in which the run integrates reference time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunDirection {
    #[default]
    Forward,
    /// Integrate backward from a recovery position.
    Reverse,
}

impl RunDirection {
    /// +1 for forward runs, -1 for reverse runs.
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}
