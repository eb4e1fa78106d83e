//! A single Monte Carlo particle.
//!
//! A particle owns its trajectory (an append-only chain of state vectors),
//! its private random stream, its fixed leeway response and the mutable
//! runtime record shared by all of its samples.

use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use seadrift_core::constants::{INFINITE_PENALTY, PENALTY_GROWTH};
use seadrift_core::enums::StateVectorType;
use seadrift_core::ids::ParticleIndex;
use seadrift_core::types::{LatLng, SimSecs};

use crate::context::DriftContext;
use crate::distress;
use crate::leeway::LeewayResponse;
use crate::state_vector::{StateVector, StateVectorKind};
use crate::underway;

/// Grounding hold, in time steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub full: u32,
    pub remaining: u32,
}

impl Penalty {
    /// Next hold length after another failed avoidance.
    pub fn grown(full: u32) -> u32 {
        (PENALTY_GROWTH * (f64::from(full) + 1.0)).round() as u32
    }

    /// Steps left to wait, or a permanent hold.
    pub fn is_held(&self) -> bool {
        self.remaining > 0
    }
}

/// Per-particle event times and hold state. Mutated only through the
/// methods below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleRuntime {
    birth: SimSecs,
    distress: SimSecs,
    expiration: Option<SimSecs>,
    landing: Option<SimSecs>,
    anchoring: Option<SimSecs>,
    penalty: Penalty,
    reported_landing: bool,
    reported_anchoring: bool,
}

impl ParticleRuntime {
    /// Runtime with no events and no hold.
    pub fn new(birth: SimSecs, distress: SimSecs, expiration: Option<SimSecs>) -> Self {
        Self {
            birth,
            distress,
            expiration,
            ..Default::default()
        }
    }

    /// Simulated time the particle comes into existence.
    pub fn birth(&self) -> SimSecs {
        self.birth
    }

    /// Simulated time the particle starts to drift.
    pub fn distress(&self) -> SimSecs {
        self.distress
    }

    /// End of survival, if the object type models it.
    pub fn expiration(&self) -> Option<SimSecs> {
        self.expiration
    }

    /// Latest grounding time.
    pub fn landing(&self) -> Option<SimSecs> {
        self.landing
    }

    /// Time the anchor held.
    pub fn anchoring(&self) -> Option<SimSecs> {
        self.anchoring
    }

    /// Current grounding hold.
    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    /// Latest grounding. A particle freed from a slippery hold that grounds
    /// again lands anew and is reported again.
    pub fn set_landing_time(&mut self, time: SimSecs) {
        if self.landing != Some(time) {
            self.landing = Some(time);
            self.reported_landing = false;
        }
    }

    /// First anchoring wins.

    pub fn set_anchoring_time(&mut self, time: SimSecs) {
        self.anchoring.get_or_insert(time);
    }

    /// Grow the hold after an unresolved avoidance.
    pub fn apply_penalty(&mut self) {
        self.penalty.full = Penalty::grown(self.penalty.full);
        self.penalty.remaining = self.penalty.full;
    }

    /// Grow the hold and make it permanent (sticky grounding).
    pub fn hold_penalty(&mut self) {
        self.penalty.full = Penalty::grown(self.penalty.full);
        self.penalty.remaining = INFINITE_PENALTY;
    }

    /// Reset the hold after a cleared avoidance run.
    pub fn clear_penalty(&mut self) {
        self.penalty = Penalty::default();
    }

    /// Count the hold down by one step. Returns true when this released it.
    pub fn tick_penalty(&mut self) -> bool {
        match self.penalty.remaining {
            0 | INFINITE_PENALTY => false,
            r => {
                self.penalty.remaining = r - 1;
                self.penalty.remaining == 0
            }
        }
    }

    /// Landing time not yet published, marking it published.
    pub fn take_unreported_landing(&mut self) -> Option<SimSecs> {
        if self.reported_landing {
            return None;
        }
        let landing = self.landing?;
        self.reported_landing = true;
        Some(landing)
    }

    /// Anchoring time not yet published, marking it published.
    pub fn take_unreported_anchoring(&mut self) -> Option<SimSecs> {
        if self.reported_anchoring {
            return None;
        }
        let anchoring = self.anchoring?;
        self.reported_anchoring = true;
        Some(anchoring)
    }
}

/// Construction inputs shared by core and mean particles.
#[derive(Debug, Clone, Copy)]
pub struct ParticleInit {
    pub index: ParticleIndex,
    pub object_type: usize,
    pub start: LatLng,
    pub birth: SimSecs,
    pub distress: SimSecs,
    pub expiration: Option<SimSecs>,
    pub init_prior: f64,
}

pub struct Particle {
    index: ParticleIndex,
    object_type: usize,
    /// Private stream; `None` for environmental-mean particles.
    pub(crate) rng: Option<ChaCha8Rng>,
    leeway: LeewayResponse,
    pub(crate) runtime: ParticleRuntime,
    init_prior: f64,
    /// Probability of detection keyed by (sortie, leg).
    pods: BTreeMap<(u32, u32), f64>,
    chain: Vec<StateVector>,
}

impl Particle {
    /// Monte Carlo particle. The root is underway when distress comes after
    /// birth.
    pub fn random(init: ParticleInit, rng: ChaCha8Rng, leeway: LeewayResponse) -> Self {
        Self::build(init, Some(rng), leeway)
    }

    /// Environmental-mean particle: no draws, mean leeway.
    pub fn mean(init: ParticleInit, leeway: LeewayResponse) -> Self {
        Self::build(init, None, leeway)
    }

    fn build(init: ParticleInit, rng: Option<ChaCha8Rng>, leeway: LeewayResponse) -> Self {
        let root = if init.distress > init.birth {
            StateVector::underway(init.birth, init.start)
        } else {
            StateVector::distress(init.birth, init.start)
        };
        Self {
            index: init.index,
            object_type: init.object_type,
            rng,
            leeway,
            runtime: ParticleRuntime::new(init.birth, init.distress, init.expiration),
            init_prior: init.init_prior,
            pods: BTreeMap::new(),
            chain: vec![root],
        }
    }

    /// Apply the distress-entry tests to a root created already in distress.
    pub fn settle(&mut self, ctx: &DriftContext<'_>) {
        if let StateVectorKind::Distress(_) = self.tail().kind {
            let mut root = *self.tail();
            underway::enter_distress(self, &mut root, ctx);
            self.chain[0] = root;
        }
    }

    /// Identity of the particle in the run.
    pub fn index(&self) -> ParticleIndex {
        self.index
    }

    /// Ordinal of the particle's object type.
    pub fn object_type(&self) -> usize {
        self.object_type
    }

    /// False for environmental-mean particles.
    pub fn is_random(&self) -> bool {
        self.rng.is_some()
    }

    /// Leeway response fixed at creation.
    pub fn leeway(&self) -> &LeewayResponse {
        &self.leeway
    }

    /// Event times and hold state.
    pub fn runtime(&self) -> &ParticleRuntime {
        &self.runtime
    }

    /// Initial prior weight read back from the archive.
    pub fn init_prior(&self) -> f64 {
        self.init_prior
    }

    /// First sample of the chain.
    pub fn root(&self) -> &StateVector {
        &self.chain[0]
    }

    /// Latest sample of the chain.
    pub fn tail(&self) -> &StateVector {
        &self.chain[self.chain.len() - 1]
    }

    /// Every sample, root first.
    /// Every sample, oldest first.
    pub fn chain(&self) -> &[StateVector] {
        &self.chain
    }

    pub(crate) fn push(&mut self, node: StateVector) {
        self.chain.push(node);
    }

    /// Advance to simulated time `t`. A tail at or past `t` is returned
    /// unchanged.
    pub fn time_update(&mut self, t: SimSecs, ctx: &DriftContext<'_>) -> &StateVector {
        if self.tail().time < t {
            match self.tail().kind {
                StateVectorKind::Underway => underway::advance(self, t, ctx),
                StateVectorKind::Distress(_) => distress::advance(self, t, ctx),
            }
        }
        self.tail()
    }

    /// Reporting classification of a sample of this particle.
    pub fn state_type_at(&self, node: &StateVector) -> StateVectorType {
        if !self.is_random() {
            return StateVectorType::EnvironmentalMean;
        }
        match self.runtime.expiration {
            Some(expiration) if node.time >= expiration => StateVectorType::Expired,
            _ => node.svt,
        }
    }

    /// Cache the probability of detection of a search leg.
    pub fn record_pod(&mut self, sortie: u32, leg: u32, pod: f64) {
        self.pods.insert((sortie, leg), pod);
    }

    /// Cached probability of detection of a search leg.
    pub fn pod(&self, sortie: u32, leg: u32) -> Option<f64> {
        self.pods.get(&(sortie, leg)).copied()
    }

    /// Forget every cached probability of detection.
    pub fn clear_pods(&mut self) {
        self.pods.clear();
    }

    /// Tear the chain down tail first.
    pub fn free(mut self) {
        while self.chain.pop().is_some() {}
        self.chain.shrink_to_fit();
        self.pods.clear();
    }
}
