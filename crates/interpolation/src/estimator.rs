//! Estimator selection and the per-cell evaluation contract

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use scatterfill_core::{Error, Raster, Result};

use crate::kriging::{GlobalKrigingParams, KrigingSystem};
use crate::points::PointSet;
use crate::tps::{LocalSpline, SplineParams, TpsModel};

/// Estimator chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EstimatorConfig {
    /// One kriging system over all points, inverted once
    GlobalKriging(GlobalKrigingParams),
    /// Thin-plate spline, global or per-query neighbourhood
    Spline(SplineParams),
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig::GlobalKriging(GlobalKrigingParams::default())
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            EstimatorConfig::GlobalKriging(p) => p.validate(),
            EstimatorConfig::Spline(p) => p.validate(),
        }
    }
}

/// Result of one successful query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub value: f64,
    /// Estimation variance, for estimators that provide one
    pub variance: Option<f64>,
}

/// Failure confined to a single query; the cell becomes missing-data.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellError {
    #[error("auxiliary grid {grid} does not cover the query point")]
    Coverage { grid: usize },

    #[error("neighbourhood holds {found} points, {required} required")]
    InsufficientNeighborhood { found: usize, required: usize },

    #[error("local spline system is singular")]
    Singular,
}

/// A prepared estimator, read-only for the whole evaluation phase.
#[derive(Debug)]
pub enum Estimator<'a> {
    GlobalKriging(KrigingSystem<'a>),
    GlobalSpline(TpsModel),
    LocalSpline(LocalSpline),
}

impl<'a> Estimator<'a> {
    /// Build whatever the configured estimator needs before cells are
    /// evaluated: the inverted kriging matrix, the global spline, or the
    /// search index.
    pub fn prepare(
        points: &PointSet,
        aux: &'a [Raster],
        config: &EstimatorConfig,
    ) -> Result<Self> {
        config.validate()?;

        match config {
            EstimatorConfig::GlobalKriging(params) => {
                KrigingSystem::initialize(points, aux, params).map(Estimator::GlobalKriging)
            }
            EstimatorConfig::Spline(params) => {
                if points.len() < 3 {
                    return Err(Error::InsufficientPoints {
                        required: 3,
                        found: points.len(),
                    });
                }
                if params.use_all_points {
                    let model = TpsModel::solve(points.as_slice(), params.regularization)?;
                    debug!(points = model.point_count(), "global spline fitted");
                    Ok(Estimator::GlobalSpline(model))
                } else {
                    let local = LocalSpline::new(points, params)?;
                    debug!(points = points.len(), "search index built");
                    Ok(Estimator::LocalSpline(local))
                }
            }
        }
    }

    /// Estimate at `(x, y)`.
    #[inline]
    pub fn evaluate(&self, x: f64, y: f64) -> std::result::Result<Estimate, CellError> {
        match self {
            Estimator::GlobalKriging(system) => system.evaluate(x, y),
            Estimator::GlobalSpline(model) => Ok(Estimate {
                value: model.evaluate(x, y),
                variance: None,
            }),
            Estimator::LocalSpline(local) => local.evaluate(x, y).map(|value| Estimate {
                value,
                variance: None,
            }),
        }
    }

    /// Whether [`Estimate::variance`] is populated.
    pub fn provides_variance(&self) -> bool {
        matches!(self, Estimator::GlobalKriging(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Estimator::GlobalKriging(_) => "global kriging",
            Estimator::GlobalSpline(_) => "global spline",
            Estimator::LocalSpline(_) => "local spline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::SamplePoint;

    fn points() -> PointSet {
        vec![
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(4.0, 0.0, 2.0),
            SamplePoint::new(0.0, 4.0, 3.0),
            SamplePoint::new(4.0, 4.0, 4.0),
        ]
        .into()
    }

    #[test]
    fn test_prepare_variants() {
        let ps = points();

        let e = Estimator::prepare(&ps, &[], &EstimatorConfig::default()).unwrap();
        assert!(matches!(e, Estimator::GlobalKriging(_)));
        assert!(e.provides_variance());

        let global = EstimatorConfig::Spline(SplineParams {
            use_all_points: true,
            ..Default::default()
        });
        let e = Estimator::prepare(&ps, &[], &global).unwrap();
        assert!(matches!(e, Estimator::GlobalSpline(_)));
        assert!(e.evaluate(2.0, 2.0).unwrap().variance.is_none());

        let local = EstimatorConfig::Spline(SplineParams::default());
        let e = Estimator::prepare(&ps, &[], &local).unwrap();
        assert_eq!(e.name(), "local spline");
    }

    #[test]
    fn test_spline_needs_three_points() {
        let ps: PointSet = vec![SamplePoint::new(0.0, 0.0, 1.0), SamplePoint::new(1.0, 1.0, 2.0)].into();
        for use_all_points in [true, false] {
            let config = EstimatorConfig::Spline(SplineParams {
                use_all_points,
                ..Default::default()
            });
            let err = Estimator::prepare(&ps, &[], &config).unwrap_err();
            assert_eq!(err.kind(), scatterfill_core::ErrorKind::Configuration);
        }
    }

    #[test]
    fn test_config_json() {
        let config: EstimatorConfig = serde_json::from_str(
            r#"{"method":"spline","regularization":0.5,"use_all_points":true}"#,
        )
        .unwrap();
        match config {
            EstimatorConfig::Spline(p) => {
                assert_eq!(p.regularization, 0.5);
                assert!(p.use_all_points);
                assert_eq!(p.search, crate::search::SearchParams::default());
            }
            other => panic!("unexpected {other:?}"),
        }

        let config: EstimatorConfig = serde_json::from_str(
            r#"{"method":"global_kriging","include_coordinate_trend":true,
                "weight":{"model":"linear","nugget":0.0,"slope":2.0}}"#,
        )
        .unwrap();
        assert!(matches!(
            config,
            EstimatorConfig::GlobalKriging(GlobalKrigingParams {
                include_coordinate_trend: true,
                ..
            })
        ));
    }
}
