//! Shoreline handling for slippery objects.
//!
//! A blocked run slides along the coast: the first iterations follow the
//! blocking edge, later ones fan out around the blocked heading. Whatever
//! distance is left after the last iteration becomes a penalty.

use std::f64::consts::TAU;

use seadrift_coast::{angle_between, heading_between, heading_of, Edge, LandService, TangentPlane};
use seadrift_core::constants::{
    AVOIDANCE_EPSILON_NMI, AVOIDANCE_MAX_ITERATIONS, AVOIDANCE_MIN_INCREMENT_NMI,
    AVOIDANCE_REFLECT_ITERATIONS, AVOIDANCE_SEARCH_MAX_DEG, AVOIDANCE_SEARCH_STEP_DEG,
};
use seadrift_core::types::LatLng;

#[derive(Debug, Clone, PartialEq)]
pub struct AvoidanceOutcome {
    pub position: LatLng,
    /// Distance (nmi) that could not be run off.
    pub remaining: f64,
    pub iterations: usize,
    /// The whole distance was consumed.
    pub cleared: bool,
    /// Remaining distance after each iteration.
    pub trace: Vec<f64>,
}

/// Run `distance` nmi from `start` on `heading`, sliding around land.
pub fn avoid_shore(land: &dyn LandService, start: LatLng, heading: f64, distance: f64) -> AvoidanceOutcome {
    let mut position = start;
    let mut heading = heading;
    let mut remaining = distance.max(0.0);
    let mut iterations = 0;
    let mut trace = Vec::with_capacity(AVOIDANCE_MAX_ITERATIONS);

    while iterations < AVOIDANCE_MAX_ITERATIONS && remaining >= AVOIDANCE_EPSILON_NMI {
        let iteration = iterations;
        iterations += 1;

        let Some(block) = land.find_blocking_edge(position, heading, remaining) else {
            position = TangentPlane::new(position).advance(heading, remaining);
            remaining = 0.0;
            trace.push(remaining);
            break;
        };

        let target = TangentPlane::new(position).advance(heading, remaining);
        remaining -= block.distance.max(AVOIDANCE_MIN_INCREMENT_NMI).min(remaining);
        position = block.stop_point;
        trace.push(remaining);
        if remaining < AVOIDANCE_EPSILON_NMI {
            break;
        }

        heading = if iteration < AVOIDANCE_REFLECT_ITERATIONS {
            reflect_along(block.edge, position, heading_between(position, target))
        } else {
            search_around(land, position, heading, remaining)
        };
    }

    AvoidanceOutcome {
        position,
        remaining,
        iterations,
        cleared: remaining < AVOIDANCE_EPSILON_NMI,
        trace,
    }
}

/// Edge direction, translated to `at`, that lies closer to `ideal`.
fn reflect_along(edge: Edge, at: LatLng, ideal: f64) -> f64 {
    let plane = TangentPlane::new(at);
    let e = plane.to_offset(edge.b) - plane.to_offset(edge.a);
    let forward = heading_of(e);
    let backward = heading_of(-e);
    if angle_between(forward, ideal) <= angle_between(backward, ideal) {
        forward
    } else {
        backward
    }
}

/// Fan out ±5°..±45° around a blocked heading.
fn search_around(land: &dyn LandService, at: LatLng, blocked: f64, remaining: f64) -> f64 {
    let steps = (AVOIDANCE_SEARCH_MAX_DEG / AVOIDANCE_SEARCH_STEP_DEG).round() as i32;
    let mut best = (blocked, f64::NEG_INFINITY);
    for k in 1..=steps {
        let offset = (AVOIDANCE_SEARCH_STEP_DEG * k as f64).to_radians();
        let good_enough = (1.0 - 0.5_f64.powi(k)) * remaining;
        for sign in [1.0, -1.0] {
            let candidate = (blocked + sign * offset).rem_euclid(TAU);
            match land.find_blocking_edge(at, candidate, remaining) {
                None => return candidate,
                Some(b) if b.distance > good_enough => return candidate,
                Some(b) => {
                    if b.distance > best.1 {
                        best = (candidate, b.distance);
                    }
                }
            }
        }
    }
    best.0
}
