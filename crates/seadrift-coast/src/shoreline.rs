//! Shoreline polygons and land queries.
//!
//! Land is a set of closed polygons in lat/lng. Nesting alternates land and
//! water: the containment level of a point is the number of polygons that
//! contain it, and odd levels are land (island, lake on the island, islet in
//! the lake, ...).

use glam::DVec2;

use seadrift_core::constants::{EDGE_CONTACT_NMI, EDGE_LOOKAHEAD_NMI, NMI_PER_DEGREE};
use seadrift_core::types::LatLng;

use crate::projection::{heading_vector, TangentPlane};

/// One shoreline segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: LatLng,
    pub b: LatLng,
}

/// Result of a blocked ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blocking {
    /// Where the ray meets the shore.
    pub stop_point: LatLng,
    /// Distance from the ray start to `stop_point` (nmi).
    pub distance: f64,
    /// The shoreline segment that blocks the ray.
    pub edge: Edge,
}

/// Land/shoreline queries used by drift physics. Must tolerate concurrent
/// reads.
pub trait LandService: Send + Sync {
    /// First shoreline crossing of the ray from `start` on `heading` within
    /// `max_distance` nmi. A ray that starts on the shore and heads inland is
    /// blocked at distance zero.
    fn find_blocking_edge(&self, start: LatLng, heading: f64, max_distance: f64)
        -> Option<Blocking>;

    /// Containment level of a point; odd means land.
    fn level_at(&self, point: LatLng) -> u32;

    fn is_land(&self, point: LatLng) -> bool {
        self.level_at(point) % 2 == 1
    }
}

#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<LatLng>,
    min: LatLng,
    max: LatLng,
}

impl Polygon {
    fn new(mut vertices: Vec<LatLng>) -> Option<Self> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return None;
        }
        let mut min = vertices[0];
        let mut max = vertices[0];
        for v in &vertices {
            min.lat = min.lat.min(v.lat);
            min.lng = min.lng.min(v.lng);
            max.lat = max.lat.max(v.lat);
            max.lng = max.lng.max(v.lng);
        }
        Some(Self { vertices, min, max })
    }

    fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Edge {
            a: self.vertices[i],
            b: self.vertices[(i + 1) % n],
        })
    }

    fn overlaps(&self, min: LatLng, max: LatLng) -> bool {
        self.min.lat <= max.lat
            && self.max.lat >= min.lat
            && self.min.lng <= max.lng
            && self.max.lng >= min.lng
    }

    /// Even-odd containment test in lat/lng.
    fn contains(&self, p: LatLng) -> bool {
        if p.lat < self.min.lat || p.lat > self.max.lat || p.lng < self.min.lng || p.lng > self.max.lng
        {
            return false;
        }
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if (vi.lat > p.lat) != (vj.lat > p.lat) {
                let x = vi.lng + (p.lat - vi.lat) / (vj.lat - vi.lat) * (vj.lng - vi.lng);
                if p.lng < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Polygon shoreline database. An empty map is open ocean.
#[derive(Debug, Clone, Default)]
pub struct ShorelineMap {
    polygons: Vec<Polygon>,
}

impl ShorelineMap {
    /// Build from closed rings; degenerate rings (< 3 vertices) are dropped.
    pub fn new(rings: Vec<Vec<LatLng>>) -> Self {
        Self {
            polygons: rings.into_iter().filter_map(Polygon::new).collect(),
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }
}

/// Slack on the segment parameter so rays through a vertex always hit.
const VERTEX_SLACK: f64 = 1.0e-9;

/// Ray parameter where unit `dir` from the plane origin crosses segment
/// `pa..pb`. Rays parallel to the segment never cross it.
fn ray_hits_segment(dir: DVec2, pa: DVec2, pb: DVec2) -> Option<f64> {
    let e = pb - pa;
    let denom = dir.perp_dot(e);
    if denom.abs() <= 1.0e-12 * e.length() {
        return None;
    }
    let t = pa.perp_dot(e) / denom;
    let s = pa.perp_dot(dir) / denom;
    if !(-VERTEX_SLACK..=1.0 + VERTEX_SLACK).contains(&s) || t < -EDGE_CONTACT_NMI {
        return None;
    }
    Some(t.max(0.0))
}

impl LandService for ShorelineMap {
    fn find_blocking_edge(
        &self,
        start: LatLng,
        heading: f64,
        max_distance: f64,
    ) -> Option<Blocking> {
        let reach = max_distance.max(0.0);
        let plane = TangentPlane::new(start);
        let dir = heading_vector(heading);

        // Search box around the ray, padded by one reach in every direction.
        let pad_lat = reach / NMI_PER_DEGREE + 1.0e-9;
        let pad_lng = reach / (NMI_PER_DEGREE * start.lat.to_radians().cos().max(1.0e-9)) + 1.0e-9;
        let min = LatLng::new(start.lat - pad_lat, start.lng - pad_lng);
        let max = LatLng::new(start.lat + pad_lat, start.lng + pad_lng);

        let mut best: Option<(f64, Edge)> = None;
        let mut contact: Option<Edge> = None;

        for polygon in self.polygons.iter().filter(|p| p.overlaps(min, max)) {
            for edge in polygon.edges() {
                let pa = plane.to_offset(edge.a);
                let pb = plane.to_offset(edge.b);
                let Some(t) = ray_hits_segment(dir, pa, pb) else {
                    continue;
                };
                if t <= EDGE_CONTACT_NMI {
                    contact = Some(edge);
                    continue;
                }
                if t <= reach && best.map_or(true, |(bt, _)| t < bt) {
                    best = Some((t, edge));
                }
            }
        }

        if let Some(edge) = contact {
            if self.is_land(plane.to_geo(dir * EDGE_LOOKAHEAD_NMI)) {
                return Some(Blocking {
                    stop_point: start,
                    distance: 0.0,
                    edge,
                });
            }
        }

        best.map(|(t, edge)| Blocking {
            stop_point: plane.to_geo(dir * t),
            distance: t,
            edge,
        })
    }

    fn level_at(&self, point: LatLng) -> u32 {
        self.polygons.iter().filter(|p| p.contains(point)).count() as u32
    }
}
