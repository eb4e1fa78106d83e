//! Current and wind providers.
//!
//! Providers are read concurrently by every slice during a time step, so
//! lookups take `&self`. Providers that batch their loading expose the
//! prepare hooks, which the tracker drives from a serial pass before the
//! concurrent one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::debug;

use seadrift_core::config::{FieldConfig, GridSlice};
use seadrift_core::constants::{NMI_PER_DEGREE, SECS_PER_HOUR};
use seadrift_core::enums::InterpolationMode;
use seadrift_core::error::DriftError;
use seadrift_core::types::{LatLng, RefSecs};

/// Vector (knots, east/north) with its 1-sigma uncertainty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldSample {
    pub u: f64,
    pub v: f64,
    pub du: f64,
    pub dv: f64,
}

pub trait EnvironmentProvider: Send + Sync {
    /// Vector at a reference time and position; `None` where there is no
    /// data.
    fn get_vector(&self, time: RefSecs, position: LatLng, mode: InterpolationMode)
        -> Option<FieldSample>;

    /// Decorrelation half-life of the uncertainty (seconds). Non-positive
    /// disables autocorrelation.
    fn half_life_seconds(&self) -> f64;

    fn is_empty(&self) -> bool;

    /// Whether the provider wants a prepare pass before each step.
    fn has_auxiliary_processing(&self) -> bool {
        false
    }

    /// Register a (time, position) that will be read during the coming step.
    fn incremental_prepare(&self, _time: RefSecs, _position: LatLng, _window_nmi: f64) {}

    /// Load everything registered since the last call.
    fn finish_prepare(&self) {}
}

/// No data at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyField;

impl EnvironmentProvider for EmptyField {
    fn get_vector(&self, _: RefSecs, _: LatLng, _: InterpolationMode) -> Option<FieldSample> {
        None
    }

    fn half_life_seconds(&self) -> f64 {
        0.0
    }

    fn is_empty(&self) -> bool {
        true
    }
}

/// Constant vector everywhere and always.
#[derive(Debug, Clone, Copy)]
pub struct UniformField {
    sample: FieldSample,
    half_life_secs: f64,
}

impl UniformField {
    pub fn new(sample: FieldSample, half_life_secs: f64) -> Self {
        Self {
            sample,
            half_life_secs,
        }
    }

    /// Vector with no uncertainty.
    pub fn calm(u: f64, v: f64) -> Self {
        Self::new(
            FieldSample {
                u,
                v,
                ..Default::default()
            },
            0.0,
        )
    }
}

impl EnvironmentProvider for UniformField {
    fn get_vector(&self, _: RefSecs, _: LatLng, _: InterpolationMode) -> Option<FieldSample> {
        Some(self.sample)
    }

    fn half_life_seconds(&self) -> f64 {
        self.half_life_secs
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Regular lat/lng grid with time slices. NaN cells are missing data.
#[derive(Debug, Clone)]
pub struct GriddedField {
    /// South-west corner.
    origin: LatLng,
    cell_deg: f64,
    width: usize,
    height: usize,
    times: Vec<RefSecs>,
    slices: Vec<GridSlice>,
    half_life_secs: f64,
}

impl GriddedField {
    pub fn new(
        origin: LatLng,
        cell_deg: f64,
        width: usize,
        height: usize,
        times: Vec<RefSecs>,
        mut slices: Vec<GridSlice>,
        half_life_secs: f64,
    ) -> Result<Self, DriftError> {
        let cells = width * height;
        if cell_deg <= 0.0 || cells == 0 {
            return Err(DriftError::InvalidConfig("grid has no cells".into()));
        }
        if times.len() != slices.len() || times.is_empty() {
            return Err(DriftError::InvalidConfig(format!(
                "grid has {} times but {} slices",
                times.len(),
                slices.len()
            )));
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DriftError::InvalidConfig(
                "grid times must be strictly ascending".into(),
            ));
        }
        for slice in &mut slices {
            if slice.du.is_empty() {
                slice.du = vec![0.0; cells];
            }
            if slice.dv.is_empty() {
                slice.dv = vec![0.0; cells];
            }
            if [&slice.u, &slice.v, &slice.du, &slice.dv]
                .iter()
                .any(|layer| layer.len() != cells)
            {
                return Err(DriftError::InvalidConfig(format!(
                    "grid slice does not hold {cells} cells"
                )));
            }
        }
        Ok(Self {
            origin,
            cell_deg,
            width,
            height,
            times,
            slices,
            half_life_secs,
        })
    }

    /// Fractional (row, col) of a position; `None` outside the grid.
    fn grid_coords(&self, p: LatLng) -> Option<(f64, f64)> {
        let row = (p.lat - self.origin.lat) / self.cell_deg;
        let col = (p.lng - self.origin.lng) / self.cell_deg;
        let max_row = (self.height - 1) as f64;
        let max_col = (self.width - 1) as f64;
        if !(0.0..=max_row).contains(&row) || !(0.0..=max_col).contains(&col) {
            return None;
        }
        Some((row, col))
    }

    fn cell(&self, slice: &GridSlice, row: usize, col: usize) -> [f64; 4] {
        let i = row * self.width + col;
        [
            slice.u[i] as f64,
            slice.v[i] as f64,
            slice.du[i] as f64,
            slice.dv[i] as f64,
        ]
    }

    fn sample_slice(&self, slice: &GridSlice, row: f64, col: f64, mode: InterpolationMode) -> [f64; 4] {
        match mode {
            InterpolationMode::Nearest => self.cell(slice, row.round() as usize, col.round() as usize),
            InterpolationMode::Linear => {
                let r0 = row.floor() as usize;
                let c0 = col.floor() as usize;
                let r1 = (r0 + 1).min(self.height - 1);
                let c1 = (c0 + 1).min(self.width - 1);
                let fr = row - r0 as f64;
                let fc = col - c0 as f64;

                let v00 = self.cell(slice, r0, c0);
                let v01 = self.cell(slice, r0, c1);
                let v10 = self.cell(slice, r1, c0);
                let v11 = self.cell(slice, r1, c1);

                let mut out = [0.0; 4];
                for k in 0..4 {
                    let bottom = v00[k] * (1.0 - fc) + v01[k] * fc;
                    let top = v10[k] * (1.0 - fc) + v11[k] * fc;
                    out[k] = bottom * (1.0 - fr) + top * fr;
                }
                out
            }
        }
    }

    /// Bracketing slice indices and the weight of the later one.
    fn time_bracket(&self, time: RefSecs) -> (usize, usize, f64) {
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return (0, 0, 0.0);
        }
        if time >= self.times[last] {
            return (last, last, 0.0);
        }
        let hi = self.times.partition_point(|t| *t <= time);
        let lo = hi - 1;
        let w = (time - self.times[lo]) as f64 / (self.times[hi] - self.times[lo]) as f64;
        (lo, hi, w)
    }
}

impl EnvironmentProvider for GriddedField {
    fn get_vector(&self, time: RefSecs, position: LatLng, mode: InterpolationMode) -> Option<FieldSample> {
        let (row, col) = self.grid_coords(position)?;
        let (lo, hi, w) = self.time_bracket(time);
        let value = match mode {
            InterpolationMode::Nearest => {
                let slice = if w < 0.5 { lo } else { hi };
                self.sample_slice(&self.slices[slice], row, col, mode)
            }
            InterpolationMode::Linear => {
                let a = self.sample_slice(&self.slices[lo], row, col, mode);
                let b = self.sample_slice(&self.slices[hi], row, col, mode);
                let mut out = [0.0; 4];
                for k in 0..4 {
                    out[k] = a[k] * (1.0 - w) + b[k] * w;
                }
                out
            }
        };
        if value.iter().any(|x| !x.is_finite()) {
            return None;
        }
        Some(FieldSample {
            u: value[0],
            v: value[1],
            du: value[2],
            dv: value[3],
        })
    }

    fn half_life_seconds(&self) -> f64 {
        self.half_life_secs
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Space-time box registered by a prepare pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefetchWindow {
    pub min: LatLng,
    pub max: LatLng,
    pub start: RefSecs,
    pub end: RefSecs,
    pub points: usize,
}

impl PrefetchWindow {
    fn around(time: RefSecs, p: LatLng, window_nmi: f64) -> Self {
        let dlat = window_nmi / NMI_PER_DEGREE;
        let dlng = window_nmi / (NMI_PER_DEGREE * p.lat.to_radians().cos().max(1.0e-9));
        Self {
            min: LatLng::new(p.lat - dlat, p.lng - dlng),
            max: LatLng::new(p.lat + dlat, p.lng + dlng),
            start: time,
            end: time,
            points: 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.min.lat = self.min.lat.min(other.min.lat);
        self.min.lng = self.min.lng.min(other.min.lng);
        self.max.lat = self.max.lat.max(other.max.lat);
        self.max.lng = self.max.lng.max(other.max.lng);
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        self.points += other.points;
    }

    pub fn contains(&self, p: LatLng) -> bool {
        (self.min.lat..=self.max.lat).contains(&p.lat) && (self.min.lng..=self.max.lng).contains(&p.lng)
    }
}

/// Batching layer over a provider: collects the window each step will read
/// and commits it in one batch.
pub struct Prefetched<F> {
    inner: F,
    pending: Mutex<Option<PrefetchWindow>>,
    ready: Mutex<Option<PrefetchWindow>>,
    batches: AtomicUsize,
}

impl<F: EnvironmentProvider> Prefetched<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            pending: Mutex::new(None),
            ready: Mutex::new(None),
            batches: AtomicUsize::new(0),
        }
    }

    /// Window committed by the latest `finish_prepare`.
    pub fn prepared_window(&self) -> Option<PrefetchWindow> {
        self.ready.lock().ok().and_then(|w| *w)
    }

    /// Number of committed batches.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }
}

impl<F: EnvironmentProvider> EnvironmentProvider for Prefetched<F> {
    fn get_vector(&self, time: RefSecs, position: LatLng, mode: InterpolationMode) -> Option<FieldSample> {
        self.inner.get_vector(time, position, mode)
    }

    fn half_life_seconds(&self) -> f64 {
        self.inner.half_life_seconds()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn has_auxiliary_processing(&self) -> bool {
        true
    }

    fn incremental_prepare(&self, time: RefSecs, position: LatLng, window_nmi: f64) {
        let window = PrefetchWindow::around(time, position, window_nmi);
        if let Ok(mut pending) = self.pending.lock() {
            match pending.as_mut() {
                Some(w) => w.merge(&window),
                None => *pending = Some(window),
            }
        }
    }

    fn finish_prepare(&self) {
        let Some(window) = self.pending.lock().ok().and_then(|mut p| p.take()) else {
            return;
        };
        debug!(
            points = window.points,
            start = window.start,
            end = window.end,
            "prefetch window committed"
        );
        if let Ok(mut ready) = self.ready.lock() {
            *ready = Some(window);
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
    }
}

/// Build a provider from configuration.
pub fn build_field(config: &FieldConfig, prefetch: bool) -> Result<Box<dyn EnvironmentProvider>, DriftError> {
    let field: Box<dyn EnvironmentProvider> = match config {
        FieldConfig::None => return Ok(Box::new(EmptyField)),
        FieldConfig::Uniform {
            u,
            v,
            du,
            dv,
            half_life_hours,
        } => {
            let field = UniformField::new(
                FieldSample {
                    u: *u,
                    v: *v,
                    du: *du,
                    dv: *dv,
                },
                half_life_hours * SECS_PER_HOUR,
            );
            if prefetch {
                Box::new(Prefetched::new(field))
            } else {
                Box::new(field)
            }
        }
        FieldConfig::Gridded {
            origin,
            cell_deg,
            width,
            height,
            times,
            slices,
            half_life_hours,
        } => {
            let field = GriddedField::new(
                *origin,
                *cell_deg,
                *width,
                *height,
                times.clone(),
                slices.clone(),
                half_life_hours * SECS_PER_HOUR,
            )?;
            if prefetch {
                Box::new(Prefetched::new(field))
            } else {
                Box::new(field)
            }
        }
    };
    Ok(field)
}
