//! Particle archive: where the engine publishes tracks.
//!
//! The archive is indexed by reference time. Writes are partitioned by
//! particle, so the in-memory implementation keeps one lock per track and
//! slices never contend on the same one.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use seadrift_core::config::RunConfig;
use seadrift_core::enums::{RunDirection, StateVectorType};
use seadrift_core::ids::ParticleIndex;
use seadrift_core::types::{LatLng, RefSecs};

pub trait ParticleArchive: Send + Sync {
    /// Sample times, ascending.
    fn times(&self) -> &[RefSecs];

    fn direction(&self) -> RunDirection;

    /// Slot for a reference time. Forward runs take the earliest time at or
    /// after `time`, reverse runs the latest at or before; both clamp to the
    /// archive range.
    fn time_index(&self, time: RefSecs) -> usize {
        let times = self.times();
        if times.is_empty() {
            return 0;
        }
        match self.direction() {
            RunDirection::Forward => times.partition_point(|t| *t < time).min(times.len() - 1),
            RunDirection::Reverse => times.partition_point(|t| *t <= time).saturating_sub(1),
        }
    }

    fn set_position(&self, index: ParticleIndex, time: RefSecs, position: LatLng);

    fn set_state_type(&self, index: ParticleIndex, time: RefSecs, state: StateVectorType);

    fn set_landing_time(&self, index: ParticleIndex, time: RefSecs);

    fn set_anchoring_time(&self, index: ParticleIndex, time: RefSecs);

    fn distress_time(&self, index: ParticleIndex) -> Option<RefSecs>;

    fn set_distress_time(&self, index: ParticleIndex, time: RefSecs);

    fn expiration_time(&self, index: ParticleIndex) -> Option<RefSecs>;

    fn set_expiration_time(&self, index: ParticleIndex, time: RefSecs);

    fn init_prior(&self, index: ParticleIndex) -> f64;

    fn set_init_prior(&self, index: ParticleIndex, prior: f64);
}

/// Everything the archive holds for one particle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub positions: Vec<Option<LatLng>>,
    pub states: Vec<Option<StateVectorType>>,
    pub landing_time: Option<RefSecs>,
    pub anchoring_time: Option<RefSecs>,
    pub distress_time: Option<RefSecs>,
    pub expiration_time: Option<RefSecs>,
    pub init_prior: f64,
}

/// In-memory archive with one lock per track.
pub struct MemoryArchive {
    times: Vec<RefSecs>,
    direction: RunDirection,
    tracks: Vec<Mutex<TrackRecord>>,
}

impl MemoryArchive {
    pub fn new(times: Vec<RefSecs>, direction: RunDirection, tracks: usize) -> Self {
        let blank = TrackRecord {
            positions: vec![None; times.len()],
            states: vec![None; times.len()],
            ..Default::default()
        };
        Self {
            tracks: (0..tracks).map(|_| Mutex::new(blank.clone())).collect(),
            times,
            direction,
        }
    }

    /// Archive sized for a run: one track per particle index, one slot per
    /// reference time.
    pub fn for_run(config: &RunConfig) -> Self {
        let tracks = config.scenarios.len() * (config.particles_per_scenario + config.object_types.len());
        Self::new(config.reference_times(), config.direction, tracks)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Copy of one track.
    pub fn track(&self, index: ParticleIndex) -> Option<TrackRecord> {
        self.tracks.get(index.overall()).map(|t| lock(t).clone())
    }

    /// Copy of every track in overall-index order.
    pub fn snapshot(&self) -> Vec<TrackRecord> {
        self.tracks.iter().map(|t| lock(t).clone()).collect()
    }

    pub fn position(&self, index: ParticleIndex, time: RefSecs) -> Option<LatLng> {
        let slot = self.time_index(time);
        self.with_track(index, |t| t.positions.get(slot).copied().flatten())
            .flatten()
    }

    pub fn state_type(&self, index: ParticleIndex, time: RefSecs) -> Option<StateVectorType> {
        let slot = self.time_index(time);
        self.with_track(index, |t| t.states.get(slot).copied().flatten())
            .flatten()
    }

    pub fn landing_time(&self, index: ParticleIndex) -> Option<RefSecs> {
        self.with_track(index, |t| t.landing_time).flatten()
    }

    pub fn anchoring_time(&self, index: ParticleIndex) -> Option<RefSecs> {
        self.with_track(index, |t| t.anchoring_time).flatten()
    }

    fn with_track<R>(&self, index: ParticleIndex, f: impl FnOnce(&mut TrackRecord) -> R) -> Option<R> {
        self.tracks.get(index.overall()).map(|t| f(&mut lock(t)))
    }
}

/// A poisoned track lock only means a slice panicked mid-write; the run is
/// aborted by then, so the data is still readable.
fn lock(track: &Mutex<TrackRecord>) -> MutexGuard<'_, TrackRecord> {
    track.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ParticleArchive for MemoryArchive {
    fn times(&self) -> &[RefSecs] {
        &self.times
    }

    fn direction(&self) -> RunDirection {
        self.direction
    }

    fn set_position(&self, index: ParticleIndex, time: RefSecs, position: LatLng) {
        let slot = self.time_index(time);
        self.with_track(index, |t| {
            if let Some(p) = t.positions.get_mut(slot) {
                *p = Some(position);
            }
        });
    }

    fn set_state_type(&self, index: ParticleIndex, time: RefSecs, state: StateVectorType) {
        let slot = self.time_index(time);
        self.with_track(index, |t| {
            if let Some(s) = t.states.get_mut(slot) {
                *s = Some(state);
            }
        });
    }

    fn set_landing_time(&self, index: ParticleIndex, time: RefSecs) {
        self.with_track(index, |t| t.landing_time = Some(time));
    }

    fn set_anchoring_time(&self, index: ParticleIndex, time: RefSecs) {
        self.with_track(index, |t| t.anchoring_time = Some(time));
    }

    fn distress_time(&self, index: ParticleIndex) -> Option<RefSecs> {
        self.with_track(index, |t| t.distress_time).flatten()
    }

    fn set_distress_time(&self, index: ParticleIndex, time: RefSecs) {
        self.with_track(index, |t| t.distress_time = Some(time));
    }

    fn expiration_time(&self, index: ParticleIndex) -> Option<RefSecs> {
        self.with_track(index, |t| t.expiration_time).flatten()
    }

    fn set_expiration_time(&self, index: ParticleIndex, time: RefSecs) {
        self.with_track(index, |t| t.expiration_time = Some(time));
    }

    fn init_prior(&self, index: ParticleIndex) -> f64 {
        self.with_track(index, |t| t.init_prior).unwrap_or(0.0)
    }

    fn set_init_prior(&self, index: ParticleIndex, prior: f64) {
        self.with_track(index, |t| t.init_prior = prior);
    }
}
