//! Deterministic seed derivation.
//!
//! One run seed drives a master ChaCha stream; each core particle takes the
//! next `u64` from it in overall-index order. A particle's private stream is
//! seeded with that sub-seed, and labelled sub-streams reuse the same key on
//! a different ChaCha stream id, so drawing from one never shifts the other.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use seadrift_core::ids::ParticleIndexes;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0001_0000_01b3;

/// FNV-1a hash of a label.
pub fn label_hash(label: &str) -> u64 {
    label.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Master sequence of particle sub-seeds.
pub struct SeedSequence {
    master: ChaCha8Rng,
}

impl SeedSequence {
    pub fn new(run_seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(run_seed),
        }
    }

    pub fn next_seed(&mut self) -> u64 {
        self.master.next_u64()
    }

    /// Sub-seeds of every core particle, indexed by `[scenario][particle]`.
    pub fn particle_seeds(run_seed: u64, indexes: &ParticleIndexes) -> Vec<Vec<u64>> {
        let mut seq = Self::new(run_seed);
        let mut seeds = vec![Vec::with_capacity(indexes.particles_per_scenario()); indexes.scenarios()];
        for index in indexes.cores() {
            seeds[index.scenario()].push(seq.next_seed());
        }
        seeds
    }
}

/// A particle's main random stream.
pub fn particle_stream(sub_seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(sub_seed)
}

/// Labelled sub-stream of a particle. This is the only place sub-streams are
/// derived.
pub fn derive_substream(sub_seed: u64, label: &str) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(sub_seed);
    rng.set_stream(label_hash(label));
    rng
}
