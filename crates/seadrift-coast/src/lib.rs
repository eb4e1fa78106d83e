//! Coastal geometry for seadrift.
//!
//! Local tangent-plane projection, shoreline polygons with ray blocking
//! queries, and bathymetry lookups.

pub use seadrift_core as core;

pub mod bathymetry;
pub mod projection;
pub mod shoreline;

// Re-export key types for convenience.
pub use bathymetry::{Bathymetry, ConstantDepth, NoBathymetry};
pub use projection::{angle_between, heading_between, heading_of, heading_vector, TangentPlane};
pub use shoreline::{Blocking, Edge, LandService, ShorelineMap};
