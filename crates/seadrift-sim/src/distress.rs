//! One drift step of a particle in distress.
//!
//! Samples current and wind at the previous position, perturbs them with
//! autocorrelated noise, adds leeway, then resolves the shoreline: sticky
//! objects stop where they touch land, slippery ones slide along it.

use std::f64::consts::LN_2;

use glam::DVec2;
use rand::Rng;
use rand_distr::StandardNormal;

use seadrift_coast::{heading_of, heading_vector, TangentPlane};
use seadrift_core::constants::{AVOIDANCE_EPSILON_NMI, SECS_PER_HOUR};
use seadrift_core::types::SimSecs;

use crate::avoidance::avoid_shore;
use crate::context::DriftContext;
use crate::environment::FieldSample;
use crate::particle::Particle;
use crate::state_vector::{DistressNoise, StateVectorKind};

/// AR(1) coefficient for a step of `dt_secs` under a half-life.
pub fn autocorrelation(dt_secs: f64, half_life_secs: f64) -> f64 {
    if half_life_secs <= 0.0 {
        return 0.0;
    }
    (-LN_2 * dt_secs / half_life_secs).exp()
}

/// Blend a fresh standard normal with the previous value.
pub fn blend(previous: Option<f32>, draw: f64, rho: f64) -> f64 {
    match previous {
        Some(z) if rho > 0.0 => rho * f64::from(z) + (1.0 - rho * rho).sqrt() * draw,
        _ => draw,
    }
}

/// Perturbed vector of a field sample; zero where there is no data.
fn perturbed(sample: Option<FieldSample>, z_east: f64, z_north: f64) -> DVec2 {
    match sample {
        Some(s) => DVec2::new(s.u + s.du * z_east, s.v + s.dv * z_north),
        None => DVec2::ZERO,
    }
}

/// Along/cross-stream components to east/north for a downstream heading.
pub fn river_to_east_north(along_cross: DVec2, downstream: f64) -> DVec2 {
    let down = heading_vector(downstream);
    let right = DVec2::new(downstream.cos(), -downstream.sin());
    down * along_cross.x + right * along_cross.y
}

pub(crate) fn advance(p: &mut Particle, t: SimSecs, ctx: &DriftContext<'_>) {
    let prev = *p.tail();
    let StateVectorKind::Distress(noise) = prev.kind else {
        return;
    };

    // Sticky and on-land holds never release; a released slippery hold
    // clears the grounding.
    let released = p.runtime.tick_penalty();
    let frozen = prev.anchored || (prev.stuck_on_land && !released);
    if frozen || p.runtime.penalty().is_held() {
        p.push(prev.frozen_at(t));
        return;
    }

    let dt = (t - prev.time) as f64;
    let reference = ctx.clock.to_reference(prev.time);
    let current = ctx.currents.get_vector(reference, prev.position, ctx.interpolation);
    let wind = ctx.winds.get_vector(reference, prev.position, ctx.interpolation);

    // Draw order is fixed: sea-east, sea-north, wind-east, wind-north.
    let (z, next_noise) = match p.rng.as_mut() {
        Some(rng) => {
            let draws: [f64; 4] = std::array::from_fn(|_| rng.sample(StandardNormal));
            let sea_rho = if released {
                0.0
            } else {
                autocorrelation(dt, ctx.currents.half_life_seconds())
            };
            let wind_rho = if released {
                0.0
            } else {
                autocorrelation(dt, ctx.winds.half_life_seconds())
            };
            let z = [
                blend(noise.sea_east, draws[0], sea_rho),
                blend(noise.sea_north, draws[1], sea_rho),
                blend(noise.wind_east, draws[2], wind_rho),
                blend(noise.wind_north, draws[3], wind_rho),
            ];
            let next = DistressNoise {
                sea_east: Some(z[0] as f32),
                sea_north: Some(z[1] as f32),
                wind_east: Some(z[2] as f32),
                wind_north: Some(z[3] as f32),
            };
            (z, next)
        }
        None => ([0.0; 4], noise),
    };

    let mut sea = perturbed(current, z[0], z[1]);
    if let Some(downstream) = ctx.river_heading {
        sea = river_to_east_north(sea, downstream);
    }
    let leeway = p.leeway().velocity(perturbed(wind, z[2], z[3]));

    let displacement = (sea + leeway) * (dt / SECS_PER_HOUR) * ctx.clock.displacement_sign();
    let distance = displacement.length();
    let mut node = prev.moved_to(t, prev.position, next_noise);
    if distance < AVOIDANCE_EPSILON_NMI {
        p.push(node);
        return;
    }
    let heading = heading_of(displacement);

    if ctx.objects.is_sticky(p.object_type()) {
        match ctx.land.find_blocking_edge(prev.position, heading, distance) {
            Some(block) => {
                node.position = block.stop_point;
                node.mark_stuck();
                p.runtime.set_landing_time(t);
                p.runtime.hold_penalty();
            }
            None => node.position = TangentPlane::new(prev.position).advance(heading, distance),
        }
    } else {
        let outcome = avoid_shore(ctx.land, prev.position, heading, distance);
        node.position = outcome.position;
        if outcome.cleared {
            p.runtime.clear_penalty();
        } else {
            node.mark_stuck();
            p.runtime.set_landing_time(t);
            p.runtime.apply_penalty();
        }
    }
    p.push(node);
}
