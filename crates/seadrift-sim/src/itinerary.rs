//! Pre-distress voyage plans.

use seadrift_coast::TangentPlane;
use seadrift_core::config::ItineraryConfig;
use seadrift_core::constants::SECS_PER_HOUR;
use seadrift_core::types::LatLng;

pub trait Itinerary: Send + Sync {
    /// Position after a further `duration_secs` underway, given the position
    /// `from` reached after `elapsed_secs`.
    fn advance(&self, from: LatLng, elapsed_secs: i64, duration_secs: i64) -> LatLng;
}

/// Straight legs between waypoints at a constant speed. A particle keeps
/// its offset from the planned track, so start scatter survives the voyage.
#[derive(Debug, Clone)]
pub struct WaypointItinerary {
    /// Departure point followed by the waypoints.
    route: Vec<LatLng>,
    /// Cumulative distance (nmi) at each route point.
    cumulative: Vec<f64>,
    speed_knots: f64,
}

impl WaypointItinerary {
    pub fn new(departure: LatLng, waypoints: &[LatLng], speed_knots: f64) -> Self {
        let mut route = Vec::with_capacity(waypoints.len() + 1);
        route.push(departure);
        route.extend_from_slice(waypoints);

        let mut cumulative = Vec::with_capacity(route.len());
        let mut total = 0.0;
        cumulative.push(total);
        for leg in route.windows(2) {
            total += TangentPlane::new(leg[0]).distance_to(leg[1]);
            cumulative.push(total);
        }
        Self {
            route,
            cumulative,
            speed_knots: speed_knots.max(0.0),
        }
    }

    pub fn from_config(departure: LatLng, config: &ItineraryConfig) -> Self {
        Self::new(departure, &config.waypoints, config.speed_knots)
    }

    /// Total route length (nmi).
    pub fn length_nmi(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Planned position after `elapsed_secs` underway. Holds at the last
    /// waypoint once the route is complete.
    pub fn planned_position(&self, elapsed_secs: i64) -> LatLng {
        let travelled = self.speed_knots * elapsed_secs.max(0) as f64 / SECS_PER_HOUR;
        if travelled >= self.length_nmi() {
            return self.route[self.route.len() - 1];
        }
        let leg = self.cumulative.partition_point(|d| *d <= travelled).max(1) - 1;
        let a = self.route[leg];
        let b = self.route[leg + 1];
        let plane = TangentPlane::new(a);
        let along = travelled - self.cumulative[leg];
        let span = self.cumulative[leg + 1] - self.cumulative[leg];
        if span <= 0.0 {
            return b;
        }
        plane.to_geo(plane.to_offset(b) * (along / span))
    }
}

impl Itinerary for WaypointItinerary {
    fn advance(&self, from: LatLng, elapsed_secs: i64, duration_secs: i64) -> LatLng {
        let planned_from = self.planned_position(elapsed_secs);
        let planned_to = self.planned_position(elapsed_secs + duration_secs);
        let offset = TangentPlane::new(planned_from).to_offset(from);
        TangentPlane::new(planned_to).to_geo(offset)
    }
}
