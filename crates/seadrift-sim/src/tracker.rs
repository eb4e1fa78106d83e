//! Tracker: the global time loop of a drift run.
//!
//! The tracker owns the world collaborators and one `ParticleSet` per
//! scenario. For every archive time it runs a serial prefetch pass over the
//! environment, then advances each scenario on the worker pool, then
//! publishes newly observed landing and anchoring events.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use seadrift_coast::{Bathymetry, ConstantDepth, LandService, NoBathymetry, ShorelineMap};
use seadrift_core::config::RunConfig;
use seadrift_core::enums::InterpolationMode;
use seadrift_core::error::DriftError;
use seadrift_core::ids::ParticleIndexes;
use seadrift_core::types::{LatLng, RefSecs};

use crate::archive::ParticleArchive;
use crate::clock::RunClock;
use crate::context::DriftContext;
use crate::environment::{build_field, EnvironmentProvider};
use crate::leeway::{LeewayProvider, ObjectCatalog};
use crate::particle_set::ParticleSet;
use crate::seeding::SeedSequence;
use crate::workers::WorkerPool;

/// Collaborators shared by every scenario.
pub struct World {
    pub currents: Box<dyn EnvironmentProvider>,
    pub winds: Box<dyn EnvironmentProvider>,
    pub land: Box<dyn LandService>,
    pub bathymetry: Box<dyn Bathymetry>,
    pub objects: Box<dyn LeewayProvider>,
}

impl World {
    pub fn from_config(config: &RunConfig) -> Result<Self, DriftError> {
        let bathymetry: Box<dyn Bathymetry> = match config.bathymetry_depth_m {
            Some(depth) => Box::new(ConstantDepth(depth)),
            None => Box::new(NoBathymetry),
        };
        Ok(Self {
            currents: build_field(&config.currents, config.prefetch_fields)?,
            winds: build_field(&config.winds, config.prefetch_fields)?,
            land: Box::new(ShorelineMap::new(config.shoreline.clone())),
            bathymetry,
            objects: Box::new(ObjectCatalog::new(config.object_types.clone())),
        })
    }

    pub fn context(&self, clock: RunClock, interpolation: InterpolationMode) -> DriftContext<'_> {
        DriftContext {
            currents: self.currents.as_ref(),
            winds: self.winds.as_ref(),
            land: self.land.as_ref(),
            objects: self.objects.as_ref(),
            bathymetry: self.bathymetry.as_ref(),
            itinerary: None,
            clock,
            interpolation,
            river_heading: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub particles: usize,
    pub landed: usize,
    pub anchored: usize,
    pub expired: usize,
    /// Final position of each object type's mean particle.
    pub mean_positions: Vec<Option<LatLng>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps_completed: usize,
    pub cancelled: bool,
    pub scenarios: Vec<ScenarioSummary>,
}

pub struct Tracker<'a> {
    config: RunConfig,
    world: World,
    archive: &'a dyn ParticleArchive,
    pool: &'a WorkerPool,
    clock: RunClock,
    sets: Vec<ParticleSet>,
    cancel: Arc<AtomicBool>,
}

impl<'a> Tracker<'a> {
    /// Build the world from configuration and populate every scenario.
    pub fn new(config: RunConfig, archive: &'a dyn ParticleArchive, pool: &'a WorkerPool) -> Result<Self, DriftError> {
        let world = World::from_config(&config)?;
        Self::with_world(config, world, archive, pool)
    }

    /// Populate every scenario against caller-supplied collaborators.
    pub fn with_world(
        config: RunConfig,
        world: World,
        archive: &'a dyn ParticleArchive,
        pool: &'a WorkerPool,
    ) -> Result<Self, DriftError> {
        config.validate()?;
        if archive.times().is_empty() {
            return Err(DriftError::InvalidConfig("archive has no sample times".into()));
        }
        for scenario in &config.scenarios {
            if scenario.requires_currents && world.currents.is_empty() {
                return Err(DriftError::MissingCurrents {
                    scenario: scenario.name.clone(),
                });
            }
            if scenario.requires_winds && world.winds.is_empty() {
                return Err(DriftError::MissingWinds {
                    scenario: scenario.name.clone(),
                });
            }
            if !world.currents.is_empty()
                && world
                    .currents
                    .get_vector(config.start_time, scenario.start, config.interpolation)
                    .is_none()
            {
                warn!(scenario = %scenario.name, "no current data at the scenario start");
            }
        }

        let clock = RunClock::new(config.start_time, config.direction);
        let indexes = ParticleIndexes::new(
            config.scenarios.len(),
            config.particles_per_scenario,
            config.object_types.len(),
        );
        let seeds = SeedSequence::particle_seeds(config.seed, &indexes);
        let base = world.context(clock, config.interpolation);

        let mut sets = Vec::with_capacity(config.scenarios.len());
        for (scenario, scenario_seeds) in seeds.iter().enumerate() {
            let set = ParticleSet::populate(scenario, &config, &indexes, scenario_seeds, archive, base)?;
            info!(
                scenario = %set.name(),
                particles = set.len(),
                means = set.means().iter().flatten().count(),
                "scenario populated"
            );
            sets.push(set);
        }

        Ok(Self {
            config,
            world,
            archive,
            pool,
            clock,
            sets,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked between time steps and between scenarios.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn sets(&self) -> &[ParticleSet] {
        &self.sets
    }

    pub fn clock(&self) -> RunClock {
        self.clock
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Run every archive time step, then release the particles.
    pub fn run(&mut self) -> Result<RunSummary, DriftError> {
        let times = self.archive.times().to_vec();
        let order: Vec<RefSecs> = if self.clock.is_reverse() {
            times.iter().rev().copied().collect()
        } else {
            times
        };
        info!(
            scenarios = self.sets.len(),
            steps = order.len(),
            direction = ?self.clock.direction(),
            workers = self.pool.threads(),
            "drift run starting"
        );

        let mut steps_completed = 0;
        let mut cancelled = false;
        'steps: for reference in order {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }
            let t = self.clock.to_sim(reference);
            self.prefetch();

            let ctx = self.world.context(self.clock, self.config.interpolation);
            for set in &mut self.sets {
                if self.cancel.load(Ordering::Relaxed) {
                    cancelled = true;
                    break 'steps;
                }
                set.time_update(t, ctx, self.pool, self.archive)?;
                let events = set.record_events(ctx, self.archive);
                if events.landed > 0 || events.anchored > 0 {
                    debug!(
                        scenario = set.scenario(),
                        landed = events.landed,
                        anchored = events.anchored,
                        "new events"
                    );
                }
            }
            steps_completed += 1;
            debug!(step = steps_completed, reference, t, "time step complete");
        }

        if cancelled {
            warn!(steps_completed, "drift run cancelled");
        }
        let summary = self.summarize(steps_completed, cancelled);
        for set in &mut self.sets {
            set.free();
        }
        info!(steps_completed, "drift run finished");
        Ok(summary)
    }

    /// Serial pass letting batching providers load what this step will read:
    /// every particle's tail time and position, deduplicated.
    fn prefetch(&self) {
        let providers: Vec<&dyn EnvironmentProvider> = [self.world.currents.as_ref(), self.world.winds.as_ref()]
            .into_iter()
            .filter(|p| p.has_auxiliary_processing())
            .collect();
        if providers.is_empty() {
            return;
        }

        let mut points = BTreeMap::new();
        for set in &self.sets {
            for particle in set.all() {
                let tail = particle.tail();
                let reference = self.clock.to_reference(tail.time);
                points.insert((reference, tail.position.quantized()), tail.position);
            }
        }
        debug!(points = points.len(), providers = providers.len(), "prefetch pass");

        for provider in providers {
            for (&(reference, _), &position) in &points {
                provider.incremental_prepare(reference, position, self.config.prefetch_window_nmi);
            }
            provider.finish_prepare();
        }
    }

    fn summarize(&self, steps_completed: usize, cancelled: bool) -> RunSummary {
        let scenarios = self
            .sets
            .iter()
            .map(|set| {
                let particles = set.particles();
                ScenarioSummary {
                    name: set.name().to_string(),
                    particles: particles.len(),
                    landed: particles.iter().filter(|p| p.runtime().landing().is_some()).count(),
                    anchored: particles.iter().filter(|p| p.runtime().anchoring().is_some()).count(),
                    expired: particles
                        .iter()
                        .filter(|p| p.runtime().expiration().is_some_and(|e| p.tail().time >= e))
                        .count(),
                    mean_positions: set
                        .means()
                        .iter()
                        .map(|m| m.as_ref().map(|p| p.tail().position))
                        .collect(),
                }
            })
            .collect();
        RunSummary {
            steps_completed,
            cancelled,
            scenarios,
        }
    }
}
