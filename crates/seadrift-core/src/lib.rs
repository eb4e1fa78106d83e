//! Core types and definitions for the seadrift engine.
//!
//! This crate defines the vocabulary shared across the other crates:
//! coordinates, particle identities, state enums, run configuration,
//! constants and the error type. It has no dependency on any runtime.

pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod ids;
pub mod types;

pub use error::DriftError;
pub use ids::{ParticleIndex, ParticleIndexes, ParticleSlot};
pub use types::{LatLng, RefSecs, SimSecs};
