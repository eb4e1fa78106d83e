//! Mapping between simulated and reference time.
//!
//! Physics is always phrased as non-decreasing simulated seconds from the
//! run origin. Reverse runs walk reference time backwards, so the mapping
//! flips sign.

use seadrift_core::enums::RunDirection;
use seadrift_core::types::{RefSecs, SimSecs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    origin: RefSecs,
    direction: RunDirection,
}

impl RunClock {
    pub fn new(origin: RefSecs, direction: RunDirection) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> RefSecs {
        self.origin
    }

    pub fn direction(&self) -> RunDirection {
        self.direction
    }

    pub fn is_reverse(&self) -> bool {
        self.direction == RunDirection::Reverse
    }

    pub fn to_reference(&self, sim: SimSecs) -> RefSecs {
        self.origin + self.direction.sign() * sim
    }

    pub fn to_sim(&self, reference: RefSecs) -> SimSecs {
        self.direction.sign() * (reference - self.origin)
    }

    /// Multiplier applied to displacements: physics runs backwards in
    /// reverse runs.
    pub fn displacement_sign(&self) -> f64 {
        self.direction.sign() as f64
    }
}
