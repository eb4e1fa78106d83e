//! Drift engine for seadrift.
//!
//! Advances a Monte Carlo ensemble of particles through current and wind
//! fields, with leeway and shoreline interaction, scenario by scenario on a
//! shared worker pool, and publishes the tracks to a particle archive.

pub mod archive;
pub mod avoidance;
pub mod clock;
pub mod context;
pub mod distress;
pub mod environment;
pub mod itinerary;
pub mod leeway;
pub mod particle;
pub mod particle_set;
pub mod seeding;
pub mod state_vector;
pub mod tracker;
mod underway;
pub mod workers;

pub use seadrift_coast as coast;
pub use seadrift_core as core;

pub use archive::{MemoryArchive, ParticleArchive};
pub use context::DriftContext;
pub use particle::Particle;
pub use particle_set::ParticleSet;
pub use tracker::{RunSummary, Tracker, World};
pub use workers::WorkerPool;

#[cfg(test)]
mod tests;
