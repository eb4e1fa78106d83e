//! Local tangent-plane projection ("flat lat-lng").
//!
//! Equirectangular projection anchored at a reference point. Offsets are in
//! nautical miles, x = East, y = North. Headings are radians, 0 = North,
//! clockwise. Accurate enough for single-step drift distances.

use std::f64::consts::{PI, TAU};

use glam::DVec2;

use seadrift_core::constants::NMI_PER_DEGREE;
use seadrift_core::types::LatLng;

/// Projection anchored at a reference position.
#[derive(Debug, Clone, Copy)]
pub struct TangentPlane {
    origin: LatLng,
    /// Cached cos(origin.lat) for longitude scaling.
    cos_ref_lat: f64,
}

impl TangentPlane {
    pub fn new(origin: LatLng) -> Self {
        Self {
            origin,
            cos_ref_lat: origin.lat.to_radians().cos().max(1.0e-9),
        }
    }

    pub fn origin(&self) -> LatLng {
        self.origin
    }

    /// Geodetic position to plane offset (nmi).
    pub fn to_offset(&self, p: LatLng) -> DVec2 {
        let mut dlng = p.lng - self.origin.lng;
        if dlng > 180.0 {
            dlng -= 360.0;
        } else if dlng < -180.0 {
            dlng += 360.0;
        }
        DVec2::new(
            dlng * NMI_PER_DEGREE * self.cos_ref_lat,
            (p.lat - self.origin.lat) * NMI_PER_DEGREE,
        )
    }

    /// Plane offset (nmi) to geodetic position.
    pub fn to_geo(&self, offset: DVec2) -> LatLng {
        LatLng::new(
            self.origin.lat + offset.y / NMI_PER_DEGREE,
            self.origin.lng + offset.x / (NMI_PER_DEGREE * self.cos_ref_lat),
        )
    }

    /// Position reached from the origin after `distance` nmi on `heading`.
    pub fn advance(&self, heading: f64, distance: f64) -> LatLng {
        self.to_geo(heading_vector(heading) * distance)
    }

    /// Planar distance from the origin (nmi).
    pub fn distance_to(&self, p: LatLng) -> f64 {
        self.to_offset(p).length()
    }
}

/// Unit vector of a heading.
pub fn heading_vector(heading: f64) -> DVec2 {
    DVec2::new(heading.sin(), heading.cos())
}

/// Heading of a plane vector, in [0, 2π).
pub fn heading_of(v: DVec2) -> f64 {
    v.x.atan2(v.y).rem_euclid(TAU)
}

/// Heading from `from` to `to` in the plane anchored at `from`.
pub fn heading_between(from: LatLng, to: LatLng) -> f64 {
    heading_of(TangentPlane::new(from).to_offset(to))
}

/// Absolute angular difference between two headings, in [0, π].
pub fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        TAU - d
    } else {
        d
    }
}
