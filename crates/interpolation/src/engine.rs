//! Run orchestration: initialization, per-cell evaluation and output writing
//!
//! A run moves through `Initializing → Evaluating → Finalizing → Done`, or
//! ends in `Failed`. Initialization is single-threaded; evaluation maps rows
//! in parallel over the read-only prepared [`Estimator`]. Per-cell failures
//! become NaN cells and are counted in [`RunStats`]; fatal failures return an
//! [`Error`] and no raster at all.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use scatterfill_core::{Error, GridSpec, Raster, Result};

use crate::estimator::{CellError, Estimator, EstimatorConfig};
use crate::maybe_rayon::map_rows;
use crate::points::{LogTransform, PointSet};
use crate::target::TargetGrid;

/// How the secondary raster reports uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceMeasure {
    #[default]
    Variance,
    StandardDeviation,
}

impl VarianceMeasure {
    #[inline]
    fn apply(self, variance: f64) -> f64 {
        match self {
            VarianceMeasure::Variance => variance,
            VarianceMeasure::StandardDeviation => variance.max(0.0).sqrt(),
        }
    }
}

/// Configuration of one interpolation run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationParams {
    /// Output grid geometry
    pub target: TargetGrid,
    /// Estimator and its parameters
    pub estimator: EstimatorConfig,
    /// Produce a secondary uncertainty raster (kriging only)
    pub compute_variance: bool,
    /// Variance or standard deviation in the secondary raster
    pub variance_measure: VarianceMeasure,
    /// Estimate `ln(1 + z − z_min)` and back-transform the result
    pub log_transform: bool,
}

impl InterpolationParams {
    /// Parse a run configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_parameter("config", "<json>", e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        self.target.validate()?;
        self.estimator.validate()
    }
}

/// Phase of a run, reported to [`Progress::on_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Evaluating,
    Finalizing,
    Done,
    Failed,
}

/// Observer of a running interpolation.
///
/// `on_row` is called once per finished row, possibly from several worker
/// threads; returning `false` cancels the run before the next row starts.
pub trait Progress: Sync {
    fn on_state(&self, _state: RunState) {}

    fn on_row(&self, _done: usize, _total: usize) -> bool {
        true
    }
}

/// Progress observer that ignores everything and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Cell counts of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Cells in the output grid
    pub cells: usize,
    /// Cells holding an estimate
    pub estimated: usize,
    /// Cells outside an auxiliary grid
    pub coverage_failures: usize,
    /// Cells with too few neighbours for the local spline
    pub neighborhood_failures: usize,
    /// Cells whose local spline system could not be solved
    pub singular_failures: usize,
}

impl RunStats {
    fn record(&mut self, err: CellError) {
        match err {
            CellError::Coverage { .. } => self.coverage_failures += 1,
            CellError::InsufficientNeighborhood { .. } => self.neighborhood_failures += 1,
            CellError::Singular => self.singular_failures += 1,
        }
    }

    fn merge(&mut self, other: &RunStats) {
        self.cells += other.cells;
        self.estimated += other.estimated;
        self.coverage_failures += other.coverage_failures;
        self.neighborhood_failures += other.neighborhood_failures;
        self.singular_failures += other.singular_failures;
    }

    /// Cells written as missing-data
    pub fn failed(&self) -> usize {
        self.coverage_failures + self.neighborhood_failures + self.singular_failures
    }
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct InterpolationResult {
    /// Estimated values; NaN where no estimate was possible
    pub estimate: Raster,
    /// Uncertainty raster, if requested and provided by the estimator
    pub variance: Option<Raster>,
    pub stats: RunStats,
}

/// Boolean/message result surface of [`run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub success: bool,
    pub message: String,
    /// Rasters of a successful run
    pub output: Option<InterpolationResult>,
}

/// Interpolate `points` onto the configured grid.
///
/// `aux` holds auxiliary covariate grids for global kriging; they are
/// ignored by the spline estimators.
pub fn interpolate(
    points: &PointSet,
    aux: &[Raster],
    params: &InterpolationParams,
) -> Result<InterpolationResult> {
    interpolate_with_progress(points, aux, params, &NoProgress)
}

/// [`interpolate`] with a progress observer that may cancel the run.
pub fn interpolate_with_progress(
    points: &PointSet,
    aux: &[Raster],
    params: &InterpolationParams,
    progress: &dyn Progress,
) -> Result<InterpolationResult> {
    progress.on_state(RunState::Idle);

    let result = execute(points, aux, params, progress);
    match &result {
        Ok(out) => {
            info!(
                cells = out.stats.cells,
                estimated = out.stats.estimated,
                failed = out.stats.failed(),
                "interpolation done"
            );
            progress.on_state(RunState::Done);
        }
        Err(e) => {
            error!(kind = ?e.kind(), "interpolation failed: {e}");
            progress.on_state(RunState::Failed);
        }
    }
    result
}

/// Run an interpolation and fold the outcome into a [`RunReport`].
pub fn run(points: &PointSet, aux: &[Raster], params: &InterpolationParams) -> RunReport {
    match interpolate(points, aux, params) {
        Ok(output) => {
            let s = output.stats;
            RunReport {
                success: true,
                message: format!(
                    "estimated {} of {} cells ({} outside auxiliary grids, {} with too few neighbours, {} singular)",
                    s.estimated,
                    s.cells,
                    s.coverage_failures,
                    s.neighborhood_failures,
                    s.singular_failures
                ),
                output: Some(output),
            }
        }
        Err(e) => RunReport {
            success: false,
            message: e.to_string(),
            output: None,
        },
    }
}

struct RowOutput {
    values: Vec<f64>,
    variance: Vec<f64>,
    stats: RunStats,
}

fn execute(
    points: &PointSet,
    aux: &[Raster],
    params: &InterpolationParams,
    progress: &dyn Progress,
) -> Result<InterpolationResult> {
    // ── Initializing ─────────────────────────────────────────────────
    progress.on_state(RunState::Initializing);
    params.validate()?;

    let spec = params.target.resolve(points)?;
    info!(
        points = points.len(),
        nx = spec.nx,
        ny = spec.ny,
        cell_size = spec.cell_size,
        "initializing interpolation"
    );

    let transform = if params.log_transform {
        LogTransform::fit(points)
    } else {
        None
    };
    let working: Cow<'_, PointSet> = match &transform {
        Some(t) => Cow::Owned(t.apply(points)),
        None => Cow::Borrowed(points),
    };

    let estimator = Estimator::prepare(&working, aux, &params.estimator)?;
    debug!(estimator = estimator.name(), "estimator prepared");

    let with_variance = params.compute_variance && estimator.provides_variance();
    if params.compute_variance && !with_variance {
        warn!(
            estimator = estimator.name(),
            "estimator provides no variance; variance raster omitted"
        );
    }

    // ── Evaluating ───────────────────────────────────────────────────
    progress.on_state(RunState::Evaluating);

    let cancelled = AtomicBool::new(false);
    let rows_done = AtomicUsize::new(0);

    let rows: Vec<Option<RowOutput>> = map_rows(spec.ny, |row| {
        if cancelled.load(Ordering::Relaxed) {
            return None;
        }

        let out = evaluate_row(
            &estimator,
            &spec,
            row,
            transform.as_ref(),
            with_variance,
            params.variance_measure,
        );

        let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
        if !progress.on_row(done, spec.ny) {
            cancelled.store(true, Ordering::Relaxed);
        }
        Some(out)
    });

    if cancelled.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
    }

    // ── Finalizing ───────────────────────────────────────────────────
    progress.on_state(RunState::Finalizing);
    drop(estimator);

    let mut stats = RunStats::default();
    let mut values = Vec::with_capacity(spec.cell_count());
    let mut variance = Vec::with_capacity(if with_variance { spec.cell_count() } else { 0 });
    for row in rows.into_iter().flatten() {
        stats.merge(&row.stats);
        values.extend(row.values);
        variance.extend(row.variance);
    }

    let estimate = Raster::from_vec(spec, values)?;
    let variance = if with_variance {
        Some(Raster::from_vec(spec, variance)?)
    } else {
        None
    };

    Ok(InterpolationResult {
        estimate,
        variance,
        stats,
    })
}

fn evaluate_row(
    estimator: &Estimator<'_>,
    spec: &GridSpec,
    row: usize,
    transform: Option<&LogTransform>,
    with_variance: bool,
    measure: VarianceMeasure,
) -> RowOutput {
    let mut values = vec![f64::NAN; spec.nx];
    let mut variance = if with_variance { vec![f64::NAN; spec.nx] } else { Vec::new() };
    let mut stats = RunStats {
        cells: spec.nx,
        ..Default::default()
    };

    for col in 0..spec.nx {
        let (x, y) = spec.cell_to_world(col, row);
        match estimator.evaluate(x, y) {
            Ok(est) => {
                values[col] = match transform {
                    Some(t) => t.inverse(est.value),
                    None => est.value,
                };
                if with_variance && let Some(v) = est.variance {
                    variance[col] = measure.apply(v);
                }
                stats.estimated += 1;
            }
            Err(e) => stats.record(e),
        }
    }

    RowOutput {
        values,
        variance,
        stats,
    }
}
