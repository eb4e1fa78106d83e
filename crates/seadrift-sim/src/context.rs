//! Read-only collaborators a particle needs to advance.

use seadrift_coast::{Bathymetry, LandService};
use seadrift_core::enums::InterpolationMode;

use crate::clock::RunClock;
use crate::environment::EnvironmentProvider;
use crate::itinerary::Itinerary;
use crate::leeway::LeewayProvider;

/// Borrowed view of the world for one time step. Cheap to copy into every
/// slice.
#[derive(Clone, Copy)]
pub struct DriftContext<'a> {
    pub currents: &'a dyn EnvironmentProvider,
    pub winds: &'a dyn EnvironmentProvider,
    pub land: &'a dyn LandService,
    pub objects: &'a dyn LeewayProvider,
    pub bathymetry: &'a dyn Bathymetry,
    /// Scenario voyage plan, if particles start underway.
    pub itinerary: Option<&'a dyn Itinerary>,
    pub clock: RunClock,
    pub interpolation: InterpolationMode,
    /// Downstream heading (radians) of a river scenario.
    pub river_heading: Option<f64>,
}
