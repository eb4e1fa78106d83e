//! Run configuration, loaded from JSON.
//!
//! A `RunConfig` describes one multi-scenario drift run: timing, ensemble
//! size, scheduling knobs, search-object types, scenarios and the
//! environment/land inputs the engine should build its collaborators from.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MIN_PARTICLES_PER_SLICE, DEFAULT_PREFETCH_WINDOW_NMI};
use crate::enums::{InterpolationMode, RunDirection};
use crate::error::DriftError;
use crate::types::{LatLng, RefSecs, SimSecs};

/// Leeway regression parameters of one search-object type.
///
/// Leeway speed (knots) = slope * wind speed (knots) + intercept + error,
/// with the error drawn once per particle from N(0, sd).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeewayParams {
    pub downwind_slope: f64,
    pub downwind_intercept: f64,
    pub downwind_sd: f64,
    pub crosswind_slope: f64,
    pub crosswind_intercept: f64,
    pub crosswind_sd: f64,
}

/// Anchoring behaviour on entering distress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchoringConfig {
    /// Probability that the anchor holds when depth allows it.
    pub probability: f64,
    /// Deepest water (meters) in which the object can anchor.
    pub max_depth_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTypeConfig {
    pub name: String,
    pub leeway: LeewayParams,
    /// Sticky objects stay where they first touch the shore.
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub anchoring: Option<AnchoringConfig>,
    /// Mean survival after distress (hours). `None` means no expiration.
    #[serde(default)]
    pub survival_hours: Option<f64>,
}

/// Pre-distress voyage along straight legs at constant speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryConfig {
    pub waypoints: Vec<LatLng>,
    pub speed_knots: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Last known position, or departure point for voyage scenarios.
    pub start: LatLng,
    /// 1-sigma scatter of the starting position (nmi).
    #[serde(default)]
    pub start_radius_nmi: f64,
    /// Distress window relative to the run origin (simulated seconds).
    #[serde(default)]
    pub distress_start_secs: SimSecs,
    #[serde(default)]
    pub distress_end_secs: SimSecs,
    /// Particles of this scenario are born this long after the run origin.
    #[serde(default)]
    pub birth_offset_secs: SimSecs,
    #[serde(default)]
    pub itinerary: Option<ItineraryConfig>,
    /// Downstream bearing (degrees) for river scenarios.
    #[serde(default)]
    pub river_heading_deg: Option<f64>,
    #[serde(default = "default_true")]
    pub requires_currents: bool,
    #[serde(default = "default_true")]
    pub requires_winds: bool,
    /// Names of the object types particles cycle through.
    pub object_types: Vec<String>,
}

/// One grid time slice, row-major south-to-north, west-to-east.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSlice {
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    #[serde(default)]
    pub du: Vec<f32>,
    #[serde(default)]
    pub dv: Vec<f32>,
}

/// Source of a current or wind field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldConfig {
    #[default]
    None,
    /// Spatially and temporally constant vector (knots).
    Uniform {
        u: f64,
        v: f64,
        #[serde(default)]
        du: f64,
        #[serde(default)]
        dv: f64,
        #[serde(default)]
        half_life_hours: f64,
    },
    /// Regular lat/lng grid with time slices.
    Gridded {
        /// South-west corner of the grid.
        origin: LatLng,
        cell_deg: f64,
        width: usize,
        height: usize,
        times: Vec<RefSecs>,
        slices: Vec<GridSlice>,
        #[serde(default)]
        half_life_hours: f64,
    },
}

impl FieldConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Top-level seed; every particle sub-seed derives from it.
    pub seed: u64,
    pub direction: RunDirection,
    /// Reference time of the run origin (Unix seconds).
    pub start_time: RefSecs,
    pub step_secs: i64,
    pub steps: usize,
    pub particles_per_scenario: usize,
    pub min_particles_per_slice: usize,
    /// Worker threads available to the scheduler besides the caller.
    pub worker_threads: usize,
    pub interpolation: InterpolationMode,
    /// Wrap environment fields in a batching prefetch layer.
    pub prefetch_fields: bool,
    pub prefetch_window_nmi: f64,
    pub object_types: Vec<ObjectTypeConfig>,
    pub scenarios: Vec<ScenarioConfig>,
    pub currents: FieldConfig,
    pub winds: FieldConfig,
    /// Closed land polygons; nesting alternates land and water.
    pub shoreline: Vec<Vec<LatLng>>,
    pub bathymetry_depth_m: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            direction: RunDirection::Forward,
            start_time: 0,
            step_secs: 3600,
            steps: 24,
            particles_per_scenario: 500,
            min_particles_per_slice: DEFAULT_MIN_PARTICLES_PER_SLICE,
            worker_threads: 0,
            interpolation: InterpolationMode::Linear,
            prefetch_fields: false,
            prefetch_window_nmi: DEFAULT_PREFETCH_WINDOW_NMI,
            object_types: Vec::new(),
            scenarios: Vec::new(),
            currents: FieldConfig::None,
            winds: FieldConfig::None,
            shoreline: Vec::new(),
            bathymetry_depth_m: None,
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self, DriftError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DriftError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Archive reference times, ascending. Forward runs start at
    /// `start_time`; reverse runs end there.
    pub fn reference_times(&self) -> Vec<RefSecs> {
        let n = self.steps as i64;
        (0..=n)
            .map(|k| match self.direction {
                RunDirection::Forward => self.start_time + k * self.step_secs,
                RunDirection::Reverse => self.start_time - (n - k) * self.step_secs,
            })
            .collect()
    }

    /// Ordinal of an object type by name.
    pub fn object_type_ordinal(&self, name: &str) -> Option<usize> {
        self.object_types.iter().position(|o| o.name == name)
    }

    /// Structural checks that do not need any collaborator.
    pub fn validate(&self) -> Result<(), DriftError> {
        if self.step_secs <= 0 {
            return Err(DriftError::InvalidConfig(format!(
                "step_secs must be positive, got {}",
                self.step_secs
            )));
        }
        if self.min_particles_per_slice == 0 {
            return Err(DriftError::InvalidConfig(
                "min_particles_per_slice must be at least 1".into(),
            ));
        }
        if self.scenarios.is_empty() {
            return Err(DriftError::InvalidConfig("no scenarios".into()));
        }
        if self.object_types.is_empty() {
            return Err(DriftError::InvalidConfig("no object types".into()));
        }
        for scenario in &self.scenarios {
            if self.particles_per_scenario == 0 {
                return Err(DriftError::EmptyScenario {
                    scenario: scenario.name.clone(),
                });
            }
            if scenario.object_types.is_empty() {
                return Err(DriftError::InvalidConfig(format!(
                    "scenario `{}` lists no object types",
                    scenario.name
                )));
            }
            for name in &scenario.object_types {
                if self.object_type_ordinal(name).is_none() {
                    return Err(DriftError::UnknownObjectType {
                        scenario: scenario.name.clone(),
                        object_type: name.clone(),
                    });
                }
            }
            if scenario.distress_end_secs < scenario.distress_start_secs {
                return Err(DriftError::InvalidConfig(format!(
                    "scenario `{}` has an inverted distress window",
                    scenario.name
                )));
            }
            if let Some(itinerary) = &scenario.itinerary {
                if self.direction == RunDirection::Reverse {
                    return Err(DriftError::InvalidConfig(format!(
                        "scenario `{}`: reverse drift cannot follow an itinerary",
                        scenario.name
                    )));
                }
                if itinerary.waypoints.is_empty() || itinerary.speed_knots < 0.0 {
                    return Err(DriftError::InvalidConfig(format!(
                        "scenario `{}` has an unusable itinerary",
                        scenario.name
                    )));
                }
            }
            if scenario.requires_currents && self.currents.is_none() {
                return Err(DriftError::MissingCurrents {
                    scenario: scenario.name.clone(),
                });
            }
            if scenario.requires_winds && self.winds.is_none() {
                return Err(DriftError::MissingWinds {
                    scenario: scenario.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}
