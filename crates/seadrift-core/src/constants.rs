//! Engine constants and tuning parameters.

/// Nautical miles per degree of latitude.
pub const NMI_PER_DEGREE: f64 = 60.0;

/// Seconds per hour; velocities are knots, displacements nautical miles.
pub const SECS_PER_HOUR: f64 = 3600.0;

// --- Shoreline avoidance ---

/// Maximum iterations of the slippery-shore avoidance loop.
pub const AVOIDANCE_MAX_ITERATIONS: usize = 6;

/// Iterations that reflect along the blocking edge before switching to the
/// heading search.
pub const AVOIDANCE_REFLECT_ITERATIONS: usize = 3;

/// Heading search step (degrees).
pub const AVOIDANCE_SEARCH_STEP_DEG: f64 = 5.0;

/// Largest heading offset tried by the search (degrees).
pub const AVOIDANCE_SEARCH_MAX_DEG: f64 = 45.0;

/// Minimum distance charged against the remaining run for a blocked
/// iteration (nmi). Guarantees progress when blocked at distance zero.
pub const AVOIDANCE_MIN_INCREMENT_NMI: f64 = 1.0e-3;

/// Remaining distance considered fully consumed (nmi).
pub const AVOIDANCE_EPSILON_NMI: f64 = 1.0e-6;

/// Intersections closer than this to the ray start count as "on the edge".
pub const EDGE_CONTACT_NMI: f64 = 1.0e-9;

/// Look-ahead distance used to decide whether a ray leaving an edge goes inland.
pub const EDGE_LOOKAHEAD_NMI: f64 = 1.0e-6;

// --- Penalty box ---

/// Growth factor of the grounding hold: full = round(1.5 * (full + 1)).
pub const PENALTY_GROWTH: f64 = 1.5;

/// Hold applied to sticky groundings; never counts down within a run.
pub const INFINITE_PENALTY: u32 = u32::MAX;

// --- Leeway ---

/// Draws consumed from the "leeway" sub-stream when a particle is built:
/// downwind error, crosswind error, jibe side.
pub const LEEWAY_DRAW_COUNT: usize = 3;

/// Sub-stream label for the leeway response.
pub const LEEWAY_SUBSTREAM: &str = "leeway";

// --- Scheduling defaults ---

/// Default lower bound of work units per slice.
pub const DEFAULT_MIN_PARTICLES_PER_SLICE: usize = 64;

/// Default prefetch window around each particle (nmi).
pub const DEFAULT_PREFETCH_WINDOW_NMI: f64 = 30.0;
