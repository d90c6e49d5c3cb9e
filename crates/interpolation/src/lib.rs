//! # Scatterfill Interpolation
//!
//! Turns scattered sample points into a dense raster estimate:
//! - Global kriging: one bordered weight system over every point, with
//!   optional auxiliary covariate grids and coordinate trend, inverted once
//! - Thin-plate spline: fitted once to all points, or per cell to a
//!   neighbourhood found through a spatial index
//! - Cross validation of either estimator
//!
//! ```ignore
//! use scatterfill_interpolation::prelude::*;
//!
//! let points = PointSet::from_features(&features, "elevation")?;
//! let params = InterpolationParams {
//!     target: TargetGrid::PointsExtent { cell_size: 25.0 },
//!     ..Default::default()
//! };
//! let result = interpolate(&points, &[], &params)?;
//! ```

pub mod cross_validation;
pub mod engine;
pub mod estimator;
pub mod kdtree;
pub mod kriging;
pub mod linalg;
mod maybe_rayon;
pub mod points;
pub mod search;
pub mod target;
pub mod tps;
pub mod weight;

pub use cross_validation::{
    cross_validate, cross_validate_log, CrossValidationSummary, Residual, ValidationMethod,
};
pub use engine::{
    interpolate, interpolate_with_progress, run, InterpolationParams, InterpolationResult,
    NoProgress, Progress, RunReport, RunState, RunStats, VarianceMeasure,
};
pub use estimator::{CellError, Estimate, Estimator, EstimatorConfig};
pub use kdtree::KdTree;
pub use kriging::{GlobalKrigingParams, KrigingSystem};
pub use points::{LogTransform, PointSet, SamplePoint};
pub use search::{Neighbor, SearchParams, SpatialIndex};
pub use target::TargetGrid;
pub use tps::{tps_kernel, LocalSpline, SplineParams, TpsModel};
pub use weight::WeightFunction;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        cross_validate, interpolate, run, EstimatorConfig, GlobalKrigingParams,
        InterpolationParams, PointSet, SamplePoint, SearchParams, SplineParams, TargetGrid,
        ValidationMethod, WeightFunction,
    };
    pub use scatterfill_core::prelude::*;
}
