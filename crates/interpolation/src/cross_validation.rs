//! Cross validation of an estimator configuration
//!
//! Each sample (leave-one-out) or each fold of samples (k-fold) is withheld,
//! the estimator is prepared on the remaining points, and the withheld values
//! are predicted. Samples whose reduced system cannot be prepared or whose
//! prediction fails are skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scatterfill_core::{Error, Raster, Result};

use crate::estimator::{Estimator, EstimatorConfig};
use crate::points::{LogTransform, PointSet};

/// How samples are withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    LeaveOneOut,
    /// Round-robin folds: sample `i` belongs to fold `i % k`
    KFold(usize),
}

/// One leave-one-out prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub x: f64,
    pub y: f64,
    pub observed: f64,
    pub predicted: f64,
}

impl Residual {
    pub fn residual(&self) -> f64 {
        self.observed - self.predicted
    }
}

/// Error statistics of a cross validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationSummary {
    /// Number of predictions made
    pub samples: usize,
    pub mse: f64,
    pub rmse: f64,
    /// RMSE as a percentage of the observed value range
    pub nrmse_percent: f64,
    /// Share of explained variation, in percent
    pub r2_percent: f64,
    /// Per-sample residuals (leave-one-out only)
    pub residuals: Vec<Residual>,
}

#[derive(Default)]
struct Accumulator {
    samples: usize,
    /// Σ (prediction − observation)²
    se: f64,
    /// Σ (prediction − mean of the training values)²
    sr: f64,
}

impl Accumulator {
    fn add(&mut self, predicted: f64, observed: f64, training_mean: f64) {
        self.samples += 1;
        self.se += (predicted - observed).powi(2);
        self.sr += (predicted - training_mean).powi(2);
    }
}

/// Cross-validate `config` on `points`.
///
/// `KFold(k)` falls back to leave-one-out when `k < 2` or `k > n / 2`.
pub fn cross_validate(
    points: &PointSet,
    aux: &[Raster],
    config: &EstimatorConfig,
    method: ValidationMethod,
) -> Result<CrossValidationSummary> {
    config.validate()?;

    let n = points.len();
    if n < 4 {
        return Err(Error::InsufficientPoints {
            required: 4,
            found: n,
        });
    }
    let (z_min, z_max) = points.value_range().unwrap_or((0.0, 0.0));
    let total: f64 = points.iter().map(|p| p.value).sum();

    let folds = match method {
        ValidationMethod::KFold(k) if k >= 2 && k as f64 <= n as f64 / 2.0 => Some(k),
        _ => None,
    };

    let mut acc = Accumulator::default();
    let mut residuals = Vec::new();

    match folds {
        None => {
            for (i, p) in points.iter().enumerate() {
                let training = points.filter_indexed(|j, _| j != i);
                let Some(predicted) = predict(&training, aux, config, p.x, p.y) else {
                    continue;
                };
                acc.add(predicted, p.value, (total - p.value) / (n - 1) as f64);
                residuals.push(Residual {
                    x: p.x,
                    y: p.y,
                    observed: p.value,
                    predicted,
                });
            }
        }
        Some(k) => {
            for fold in 0..k {
                let training = points.filter_indexed(|i, _| i % k != fold);
                let mean = training.iter().map(|p| p.value).sum::<f64>() / training.len() as f64;

                let estimator = match Estimator::prepare(&training, aux, config) {
                    Ok(e) => e,
                    Err(e) => {
                        debug!(fold, "fold skipped: {e}");
                        continue;
                    }
                };

                for p in points.iter().skip(fold).step_by(k) {
                    if let Ok(est) = estimator.evaluate(p.x, p.y) {
                        acc.add(est.value, p.value, mean);
                    }
                }
            }
        }
    }

    if acc.samples == 0 {
        return Err(Error::Other(
            "cross validation produced no predictions".into(),
        ));
    }

    let mse = acc.se / acc.samples as f64;
    let rmse = mse.sqrt();
    let range = z_max - z_min;
    let summary = CrossValidationSummary {
        samples: acc.samples,
        mse,
        rmse,
        nrmse_percent: if range > 0.0 { rmse / range * 100.0 } else { f64::NAN },
        r2_percent: if acc.sr + acc.se > 0.0 {
            acc.sr / (acc.sr + acc.se) * 100.0
        } else {
            f64::NAN
        },
        residuals,
    };

    info!(
        method = ?method,
        samples = summary.samples,
        rmse = summary.rmse,
        r2 = summary.r2_percent,
        "cross validation"
    );

    Ok(summary)
}

/// Cross-validate `config` on log-transformed values.
///
/// Values are mapped with the [`LogTransform`] a `log_transform` run would
/// use, so every statistic is in log space.
pub fn cross_validate_log(
    points: &PointSet,
    aux: &[Raster],
    config: &EstimatorConfig,
    method: ValidationMethod,
) -> Result<CrossValidationSummary> {
    match LogTransform::fit(points) {
        Some(transform) => cross_validate(&transform.apply(points), aux, config, method),
        None => cross_validate(points, aux, config, method),
    }
}

fn predict(
    training: &PointSet,
    aux: &[Raster],
    config: &EstimatorConfig,
    x: f64,
    y: f64,
) -> Option<f64> {
    let estimator = Estimator::prepare(training, aux, config).ok()?;
    estimator.evaluate(x, y).ok().map(|e| e.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::SamplePoint;
    use crate::tps::SplineParams;
    use approx::assert_relative_eq;

    fn plane(n: usize) -> PointSet {
        (0..n)
            .map(|i| {
                let x = ((i * 7 + 3) % 11) as f64;
                let y = ((i * 5 + 1) % 13) as f64;
                SamplePoint::new(x, y, 3.0 + 2.0 * x - y)
            })
            .collect()
    }

    fn global_spline() -> EstimatorConfig {
        EstimatorConfig::Spline(SplineParams {
            use_all_points: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_leave_one_out_on_plane_is_exact() {
        let ps = plane(12);
        let s = cross_validate(&ps, &[], &global_spline(), ValidationMethod::LeaveOneOut).unwrap();
        assert_eq!(s.samples, 12);
        assert_eq!(s.residuals.len(), 12);
        assert_relative_eq!(s.rmse, 0.0, epsilon = 1e-6);
        assert_relative_eq!(s.r2_percent, 100.0, epsilon = 1e-6);
        for r in &s.residuals {
            assert_relative_eq!(r.residual(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_k_fold() {
        let ps = plane(12);
        let s = cross_validate(&ps, &[], &global_spline(), ValidationMethod::KFold(3)).unwrap();
        assert_eq!(s.samples, 12);
        assert!(s.residuals.is_empty());
        assert!(s.rmse < 1e-6);
    }

    #[test]
    fn test_k_fold_falls_back_to_leave_one_out() {
        let ps = plane(8);
        for k in [0, 1, 5] {
            let s = cross_validate(&ps, &[], &global_spline(), ValidationMethod::KFold(k)).unwrap();
            assert_eq!(s.residuals.len(), 8, "k = {k}");
        }
    }

    #[test]
    fn test_kriging_statistics() {
        let mut pts: Vec<SamplePoint> = plane(10).iter().copied().collect();
        pts[3].value += 5.0;
        let ps = PointSet::new(pts);

        let s = cross_validate(&ps, &[], &EstimatorConfig::default(), ValidationMethod::LeaveOneOut)
            .unwrap();
        assert!(s.mse > 0.0);
        assert_relative_eq!(s.rmse, s.mse.sqrt());
        let (lo, hi) = ps.value_range().unwrap();
        assert_relative_eq!(s.nrmse_percent, s.rmse / (hi - lo) * 100.0);
        assert!(s.r2_percent > 0.0 && s.r2_percent < 100.0);
    }

    #[test]
    fn test_log_space_statistics() {
        // ln(1 + z − z_min) is a plane, z itself is not
        let base = plane(12);
        let p = |q: &SamplePoint| 0.1 * q.x + 0.05 * q.y;
        let p_min = base.iter().map(p).fold(f64::INFINITY, f64::min);
        let ps: PointSet = base
            .iter()
            .map(|q| SamplePoint::new(q.x, q.y, (p(q) - p_min).exp() + 1.0))
            .collect();

        let config = global_spline();
        let raw = cross_validate(&ps, &[], &config, ValidationMethod::LeaveOneOut).unwrap();
        let log = cross_validate_log(&ps, &[], &config, ValidationMethod::LeaveOneOut).unwrap();

        assert_eq!(log.samples, 12);
        assert_relative_eq!(log.rmse, 0.0, epsilon = 1e-6);
        assert!(raw.rmse > 1e-3);
        for r in &log.residuals {
            let q = ps.iter().find(|q| q.x == r.x && q.y == r.y).unwrap();
            assert_relative_eq!(r.observed, p(q) - p_min, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_too_few_points() {
        let ps = plane(3);
        assert!(cross_validate(&ps, &[], &global_spline(), ValidationMethod::LeaveOneOut).is_err());
    }
}
