//! All particles of one scenario, and the per-step scheduler that advances
//! them.
//!
//! A step is split into strided slices of at least `min_particles_per_slice`
//! particles. Leased slices run on the worker pool, the rest on the calling
//! thread, which always keeps one slice for itself. Every particle owns its
//! random stream, so results do not depend on how slices are distributed.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use glam::DVec2;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::{debug, error};

use seadrift_coast::TangentPlane;
use seadrift_core::config::RunConfig;
use seadrift_core::constants::{LEEWAY_SUBSTREAM, SECS_PER_HOUR};
use seadrift_core::error::DriftError;
use seadrift_core::ids::{ParticleIndex, ParticleIndexes, ParticleSlot};
use seadrift_core::types::SimSecs;

use crate::archive::ParticleArchive;
use crate::context::DriftContext;
use crate::itinerary::{Itinerary, WaypointItinerary};
use crate::leeway::LeewayResponse;
use crate::particle::{Particle, ParticleInit};
use crate::seeding::{derive_substream, particle_stream};
use crate::workers::WorkerPool;

/// Event counts observed in one pass over a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub landed: usize,
    pub anchored: usize,
}

pub struct ParticleSet {
    scenario: usize,
    name: String,
    particles: Vec<Particle>,
    /// One slot per object type; `None` when the scenario does not use it.
    means: Vec<Option<Particle>>,
    itinerary: Option<WaypointItinerary>,
    /// Downstream heading (radians) for river scenarios.
    river_heading: Option<f64>,
    min_particles_per_slice: usize,
}

/// Scenario-specific view of the shared context.
fn scenario_context<'a>(
    base: DriftContext<'a>,
    itinerary: Option<&'a WaypointItinerary>,
    river_heading: Option<f64>,
) -> DriftContext<'a> {
    DriftContext {
        itinerary: itinerary.map(|i| i as &dyn Itinerary),
        river_heading,
        ..base
    }
}

impl ParticleSet {
    /// Create and initialise every particle of a scenario. Draws per core
    /// particle, from its main stream: distress time, two start-scatter
    /// normals, survival; then the leeway response from its own sub-stream.
    pub fn populate(
        scenario_index: usize,
        config: &RunConfig,
        indexes: &ParticleIndexes,
        seeds: &[u64],
        archive: &dyn ParticleArchive,
        base: DriftContext<'_>,
    ) -> Result<Self, DriftError> {
        let scenario = config.scenarios.get(scenario_index).ok_or_else(|| {
            DriftError::InvalidConfig(format!("no scenario at index {scenario_index}"))
        })?;
        let types = scenario
            .object_types
            .iter()
            .map(|name| {
                config
                    .object_type_ordinal(name)
                    .ok_or_else(|| DriftError::UnknownObjectType {
                        scenario: scenario.name.clone(),
                        object_type: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if types.is_empty() || config.particles_per_scenario == 0 {
            return Err(DriftError::EmptyScenario {
                scenario: scenario.name.clone(),
            });
        }

        let prior = scenario.weight / config.particles_per_scenario as f64;
        let birth = scenario.birth_offset_secs;
        let (window_start, window_end) = (scenario.distress_start_secs, scenario.distress_end_secs);
        let plane = TangentPlane::new(scenario.start);
        let clock = base.clock;

        let mut particles = Vec::with_capacity(config.particles_per_scenario);
        for p in 0..config.particles_per_scenario {
            let (Some(index), Some(&seed)) = (indexes.core(scenario_index, p), seeds.get(p)) else {
                return Err(DriftError::InvalidConfig(format!(
                    "particle {p} of scenario `{}` is outside the run layout",
                    scenario.name
                )));
            };
            let object_type = types[p % types.len()];

            let mut rng = particle_stream(seed);
            let u: f64 = rng.gen();
            let distress = window_start + ((window_end - window_start) as f64 * u).round() as SimSecs;
            let scatter = DVec2::new(rng.sample(StandardNormal), rng.sample(StandardNormal));
            let start = plane.to_geo(scatter * scenario.start_radius_nmi);
            let survival: f64 = rng.gen();
            let expiration = base.objects.survival_hours(object_type).map(|hours| {
                distress + (-(1.0 - survival).ln() * hours * SECS_PER_HOUR).round() as SimSecs
            });

            let mut leeway_rng = derive_substream(seed, LEEWAY_SUBSTREAM);
            let leeway = LeewayResponse::draw(base.objects.params(object_type), &mut leeway_rng);

            archive.set_distress_time(index, clock.to_reference(distress));
            if let Some(expiration) = expiration {
                archive.set_expiration_time(index, clock.to_reference(expiration));
            }
            archive.set_init_prior(index, prior);

            let init = ParticleInit {
                index,
                object_type,
                start,
                birth,
                distress,
                expiration,
                init_prior: archive.init_prior(index),
            };
            particles.push(Particle::random(init, rng, leeway));
        }

        let mid_distress = window_start + (window_end - window_start) / 2;
        let means = (0..indexes.object_types())
            .map(|object_type| {
                if !types.contains(&object_type) {
                    return None;
                }
                let index = indexes.mean(scenario_index, object_type)?;
                let init = ParticleInit {
                    index,
                    object_type,
                    start: scenario.start,
                    birth,
                    distress: mid_distress,
                    expiration: None,
                    init_prior: 0.0,
                };
                Some(Particle::mean(
                    init,
                    LeewayResponse::mean(base.objects.params(object_type)),
                ))
            })
            .collect();

        let mut set = Self {
            scenario: scenario_index,
            name: scenario.name.clone(),
            particles,
            means,
            itinerary: scenario
                .itinerary
                .as_ref()
                .map(|it| WaypointItinerary::from_config(scenario.start, it)),
            river_heading: scenario.river_heading_deg.map(f64::to_radians),
            min_particles_per_slice: config.min_particles_per_slice.max(1),
        };

        let ctx = scenario_context(base, set.itinerary.as_ref(), set.river_heading);
        for particle in set.particles.iter_mut().chain(set.means.iter_mut().flatten()) {
            particle.settle(&ctx);
        }
        Ok(set)
    }

    /// Scenario ordinal.
    pub fn scenario(&self) -> usize {
        self.scenario
    }

    /// Scenario name from configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Core particles in index order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mean particles, one slot per object type.
    pub fn means(&self) -> &[Option<Particle>] {
        &self.means
    }

    /// Number of core particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Look up a core or mean particle of this scenario.
    pub fn particle(&self, index: ParticleIndex) -> Option<&Particle> {
        if index.scenario() != self.scenario {
            return None;
        }
        match index.slot() {
            ParticleSlot::Core(p) => self.particles.get(p),
            ParticleSlot::Mean(t) => self.means.get(t).and_then(Option::as_ref),
        }
    }

    /// Core particles followed by the present mean particles.
    pub fn all(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().chain(self.means.iter().flatten())
    }

    /// Advance every particle to simulated time `t` and publish the samples.
    pub fn time_update(
        &mut self,
        t: SimSecs,
        base: DriftContext<'_>,
        pool: &WorkerPool,
        archive: &dyn ParticleArchive,
    ) -> Result<(), DriftError> {
        let ctx = scenario_context(base, self.itinerary.as_ref(), self.river_heading);
        let work = self.particles.len() + self.means.iter().flatten().count();
        if work == 0 {
            return Ok(());
        }
        let slices = work.div_ceil(self.min_particles_per_slice).max(1);

        let mut buckets: Vec<Vec<&mut Particle>> = (0..slices).map(|_| Vec::new()).collect();
        for (i, particle) in self
            .particles
            .iter_mut()
            .chain(self.means.iter_mut().flatten())
            .enumerate()
        {
            buckets[i % slices].push(particle);
        }
        let own = buckets.pop().unwrap_or_default();
        let own_slice = buckets.len();
        let leases = pool.try_acquire(buckets.len());
        debug!(
            scenario = self.scenario,
            t,
            slices,
            leased = leases.len(),
            "advancing particle set"
        );

        let (tx, rx) = mpsc::channel();
        pool.in_place_scope(|scope| {
            let mut pending = buckets.into_iter().enumerate();
            for (lease, (slice, bucket)) in leases.into_iter().zip(pending.by_ref()) {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let _lease = lease;
                    let _ = tx.send((slice, run_slice(bucket, t, &ctx, archive)));
                });
            }
            for (slice, bucket) in pending {
                let _ = tx.send((slice, run_slice(bucket, t, &ctx, archive)));
            }
            let _ = tx.send((own_slice, run_slice(own, t, &ctx, archive)));
        });
        drop(tx);

        let mut failures: Vec<(usize, String)> = rx
            .into_iter()
            .filter_map(|(slice, result)| result.err().map(|message| (slice, message)))
            .collect();
        failures.sort_by_key(|(slice, _)| *slice);
        if let Some((slice, message)) = failures.into_iter().next() {
            error!(scenario = self.scenario, slice, %message, "particle slice failed");
            return Err(DriftError::SliceFailed {
                scenario: self.scenario,
                slice,
                message,
            });
        }
        Ok(())
    }

    /// Publish landing and anchoring events not yet in the archive, for core
    /// and mean particles alike.
    pub fn record_events(&mut self, base: DriftContext<'_>, archive: &dyn ParticleArchive) -> EventCounts {
        let mut counts = EventCounts::default();
        for particle in self.particles.iter_mut().chain(self.means.iter_mut().flatten()) {
            let index = particle.index();
            if let Some(landing) = particle.runtime.take_unreported_landing() {
                archive.set_landing_time(index, base.clock.to_reference(landing));
                counts.landed += 1;
            }
            if let Some(anchoring) = particle.runtime.take_unreported_anchoring() {
                archive.set_anchoring_time(index, base.clock.to_reference(anchoring));
                counts.anchored += 1;
            }
        }
        counts
    }

    /// Release every particle.
    pub fn free(&mut self) {
        for particle in self.particles.drain(..) {
            particle.free();
        }
        for particle in self.means.drain(..).flatten() {
            particle.free();
        }
    }
}

fn run_slice(
    slice: Vec<&mut Particle>,
    t: SimSecs,
    ctx: &DriftContext<'_>,
    archive: &dyn ParticleArchive,
) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        for particle in slice {
            particle.time_update(t, ctx);
            publish(particle, t, ctx, archive);
        }
    }))
    .map_err(|payload| panic_message(payload.as_ref()))
}

/// Write the sample at `t`. Particles not yet born have nothing to write.
fn publish(particle: &Particle, t: SimSecs, ctx: &DriftContext<'_>, archive: &dyn ParticleArchive) {
    let tail = particle.tail();
    if tail.time > t {
        return;
    }
    let reference = ctx.clock.to_reference(t);
    archive.set_position(particle.index(), reference, tail.position);
    archive.set_state_type(particle.index(), reference, particle.state_type_at(tail));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
