//! Particle identities.
//!
//! A `ParticleIndex` names either a core particle of a scenario or the
//! environmental-mean pseudo-particle of one search-object type. Every index
//! carries a derived `overall` integer which is the stable sort and lookup
//! key (archive rows, seed order, reporting order).

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Which particle of a scenario an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleSlot {
    /// Ordinary Monte Carlo particle.
    Core(usize),
    /// Deterministic mean particle for a search-object type ordinal.
    Mean(usize),
}

/// Immutable identity of a (scenario, particle) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParticleIndex {
    scenario: usize,
    slot: ParticleSlot,
    overall: usize,
}

impl ParticleIndex {
    pub fn scenario(&self) -> usize {
        self.scenario
    }

    pub fn slot(&self) -> ParticleSlot {
        self.slot
    }

    pub fn overall(&self) -> usize {
        self.overall
    }

    pub fn is_mean(&self) -> bool {
        matches!(self.slot, ParticleSlot::Mean(_))
    }

    /// Core particle ordinal, `None` for mean particles.
    pub fn particle(&self) -> Option<usize> {
        match self.slot {
            ParticleSlot::Core(p) => Some(p),
            ParticleSlot::Mean(_) => None,
        }
    }
}

impl PartialEq for ParticleIndex {
    fn eq(&self, other: &Self) -> bool {
        self.overall == other.overall
    }
}

impl Eq for ParticleIndex {}

impl Hash for ParticleIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.overall.hash(state);
    }
}

impl PartialOrd for ParticleIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParticleIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.overall.cmp(&other.overall)
    }
}

impl std::fmt::Display for ParticleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot {
            ParticleSlot::Core(p) => write!(f, "s{}p{}", self.scenario, p),
            ParticleSlot::Mean(t) => write!(f, "s{}mean{}", self.scenario, t),
        }
    }
}

/// Factory for every index of a run layout.
///
/// Layout per scenario: `particles_per_scenario` core slots followed by one
/// mean slot per object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleIndexes {
    scenarios: usize,
    particles_per_scenario: usize,
    object_types: usize,
}

impl ParticleIndexes {
    pub fn new(scenarios: usize, particles_per_scenario: usize, object_types: usize) -> Self {
        Self {
            scenarios,
            particles_per_scenario,
            object_types,
        }
    }

    pub fn scenarios(&self) -> usize {
        self.scenarios
    }

    pub fn particles_per_scenario(&self) -> usize {
        self.particles_per_scenario
    }

    pub fn object_types(&self) -> usize {
        self.object_types
    }

    fn stride(&self) -> usize {
        self.particles_per_scenario + self.object_types
    }

    /// Total number of indices, means included.
    pub fn len(&self) -> usize {
        self.scenarios * self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of a core particle. `None` when out of layout.
    pub fn core(&self, scenario: usize, particle: usize) -> Option<ParticleIndex> {
        if scenario >= self.scenarios || particle >= self.particles_per_scenario {
            return None;
        }
        Some(ParticleIndex {
            scenario,
            slot: ParticleSlot::Core(particle),
            overall: scenario * self.stride() + particle,
        })
    }

    /// Index of the mean particle of an object type. `None` when out of layout.
    pub fn mean(&self, scenario: usize, object_type: usize) -> Option<ParticleIndex> {
        if scenario >= self.scenarios || object_type >= self.object_types {
            return None;
        }
        Some(ParticleIndex {
            scenario,
            slot: ParticleSlot::Mean(object_type),
            overall: scenario * self.stride() + self.particles_per_scenario + object_type,
        })
    }

    /// Rebuild an index from its overall value.
    pub fn from_overall(&self, overall: usize) -> Option<ParticleIndex> {
        if overall >= self.len() {
            return None;
        }
        let scenario = overall / self.stride();
        let slot = overall % self.stride();
        if slot < self.particles_per_scenario {
            self.core(scenario, slot)
        } else {
            self.mean(scenario, slot - self.particles_per_scenario)
        }
    }

    /// Every index in overall order.
    pub fn all(&self) -> impl Iterator<Item = ParticleIndex> + '_ {
        (0..self.len()).filter_map(move |o| self.from_overall(o))
    }

    /// Core particle indices in overall order; this is the seed order.
    pub fn cores(&self) -> impl Iterator<Item = ParticleIndex> + '_ {
        (0..self.scenarios).flat_map(move |s| {
            (0..self.particles_per_scenario).filter_map(move |p| self.core(s, p))
        })
    }
}
