//! Pre-distress motion and the transition into distress.

use rand::Rng;

use seadrift_core::types::SimSecs;

use crate::context::DriftContext;
use crate::distress;
use crate::particle::Particle;
use crate::state_vector::StateVector;

pub(crate) fn advance(p: &mut Particle, t: SimSecs, ctx: &DriftContext<'_>) {
    let prev = *p.tail();
    let birth = p.runtime.birth();
    let distress_time = p.runtime.distress();
    let until = t.min(distress_time);

    let position = match ctx.itinerary {
        Some(itinerary) if until > prev.time => {
            itinerary.advance(prev.position, prev.time - birth, until - prev.time)
        }
        _ => prev.position,
    };

    if t < distress_time {
        p.push(StateVector::underway(t, position));
        return;
    }

    let mut node = StateVector::distress(distress_time, position);
    enter_distress(p, &mut node, ctx);
    p.push(node);
    if t > distress_time {
        distress::advance(p, t, ctx);
    }
}

/// Tests applied once when a particle enters distress: on land it is stuck
/// for good, otherwise a random particle may anchor.
pub(crate) fn enter_distress(p: &mut Particle, node: &mut StateVector, ctx: &DriftContext<'_>) {
    if ctx.land.is_land(node.position) {
        node.mark_stuck();
        p.runtime.set_landing_time(node.time);
        p.runtime.hold_penalty();
        return;
    }
    let object_type = p.object_type();
    let Some(rng) = p.rng.as_mut() else {
        return;
    };
    let draw: f64 = rng.gen();
    if ctx.objects.anchors(object_type, node.position, draw, ctx.bathymetry) {
        node.mark_anchored();
        p.runtime.set_anchoring_time(node.time);
    }
}
