//! Thin Plate Spline (TPS) interpolation
//!
//! Constructs a smooth surface that passes through the sample points while
//! minimizing the bending energy (integral of squared second derivatives).
//!
//! The TPS interpolant has the form:
//! ```text
//! f(x,y) = a₁ + a₂·x + a₃·y + Σᵢ wᵢ · U(‖(x,y) - (xᵢ,yᵢ)‖)
//! ```
//! where U(r) = r²·ln(r) is the TPS radial basis function in 2D.
//!
//! The spline is either fitted once to every point ([`TpsModel`]) or fitted
//! per query to the neighbours returned by a spatial index ([`LocalSpline`]).
//!
//! Reference:
//! Duchon, J. (1976). Interpolation des fonctions de deux variables suivant
//! le principe de la flexion des plaques minces. RAIRO Analyse Numérique.
//! Wahba, G. (1990). Spline Models for Observational Data. SIAM.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use scatterfill_core::{Error, Result};

use crate::estimator::CellError;
use crate::kdtree::KdTree;
use crate::linalg;
use crate::points::{PointSet, SamplePoint};
use crate::search::{SearchParams, SpatialIndex};

/// Parameters for thin-plate-spline estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplineParams {
    /// Smoothing (≥ 0). 0 = exact interpolation; larger values give a
    /// smoother surface that no longer passes through the samples.
    pub regularization: f64,
    /// Fit one spline to every point instead of one per query
    pub use_all_points: bool,
    /// Neighbourhood used per query when `use_all_points` is off
    pub search: SearchParams,
}

impl Default for SplineParams {
    fn default() -> Self {
        Self {
            regularization: 0.0,
            use_all_points: false,
            search: SearchParams::default(),
        }
    }
}

impl SplineParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.regularization >= 0.0 && self.regularization.is_finite()) {
            return Err(Error::invalid_parameter(
                "regularization",
                self.regularization,
                "must be non-negative",
            ));
        }
        if !self.use_all_points {
            self.search.validate()?;
        }
        Ok(())
    }
}

/// TPS radial basis function: U(r) = r² · ln(r), with U(0) = 0
#[inline]
pub fn tps_kernel(r: f64) -> f64 {
    if r < 1e-15 { 0.0 } else { r * r * r.ln() }
}

/// A fitted thin-plate spline.
///
/// Coordinates are shifted to the centroid of the fitted points before the
/// system is assembled, which keeps the polynomial block well scaled for
/// projected coordinates far from the origin.
#[derive(Debug, Clone)]
pub struct TpsModel {
    /// Centred sample coordinates
    centres: Vec<(f64, f64)>,
    weights: Vec<f64>,
    /// Polynomial coefficients (a₁, a₂, a₃) in centred coordinates
    trend: [f64; 3],
    origin: (f64, f64),
}

impl TpsModel {
    /// Fit a spline to `points`.
    ///
    /// Builds the (n+3) × (n+3) system
    /// ```text
    /// [K + ρI  P] [w]   [z]
    /// [Pᵀ      0] [a] = [0]
    /// ```
    /// with `ρ = regularization · ā²`, ā being the mean pairwise distance.
    pub fn solve(points: &[SamplePoint], regularization: f64) -> Result<Self> {
        let n = points.len();
        if n < 3 {
            return Err(Error::InsufficientPoints { required: 3, found: n });
        }

        let ox = points.iter().map(|p| p.x).sum::<f64>() / n as f64;
        let oy = points.iter().map(|p| p.y).sum::<f64>() / n as f64;
        let centres: Vec<(f64, f64)> = points.iter().map(|p| (p.x - ox, p.y - oy)).collect();

        let m = n + 3;
        let mut mat = Array2::<f64>::zeros((m, m));
        let mut rhs = Array1::<f64>::zeros(m);

        let mut distance_sum = 0.0;
        for i in 0..n {
            let (xi, yi) = centres[i];
            for j in (i + 1)..n {
                let (xj, yj) = centres[j];
                let r = ((xi - xj).powi(2) + (yi - yj).powi(2)).sqrt();
                let u = tps_kernel(r);
                mat[(i, j)] = u;
                mat[(j, i)] = u;
                distance_sum += 2.0 * r;
            }

            mat[(i, n)] = 1.0;
            mat[(i, n + 1)] = xi;
            mat[(i, n + 2)] = yi;
            mat[(n, i)] = 1.0;
            mat[(n + 1, i)] = xi;
            mat[(n + 2, i)] = yi;

            rhs[i] = points[i].value;
        }

        if regularization > 0.0 {
            let mean_distance = distance_sum / (n * n) as f64;
            let rho = regularization * mean_distance * mean_distance;
            for i in 0..n {
                mat[(i, i)] = rho;
            }
        }

        let coeffs = linalg::solve(mat, rhs)?;

        Ok(Self {
            centres,
            weights: coeffs.iter().take(n).copied().collect(),
            trend: [coeffs[n], coeffs[n + 1], coeffs[n + 2]],
            origin: (ox, oy),
        })
    }

    /// Value of the spline at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let x = x - self.origin.0;
        let y = y - self.origin.1;

        let [a1, a2, a3] = self.trend;
        let radial: f64 = self
            .centres
            .iter()
            .zip(&self.weights)
            .map(|(&(cx, cy), w)| {
                let r = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
                w * tps_kernel(r)
            })
            .sum();

        a1 + a2 * x + a3 * y + radial
    }

    /// Number of points the spline was fitted to.
    pub fn point_count(&self) -> usize {
        self.centres.len()
    }
}

/// Spline fitted per query to a neighbourhood from a spatial index.
pub struct LocalSpline {
    index: Box<dyn SpatialIndex>,
    search: SearchParams,
    regularization: f64,
}

impl LocalSpline {
    /// Index `points` with a [`KdTree`].
    pub fn new(points: &PointSet, params: &SplineParams) -> Result<Self> {
        let index = KdTree::build(points.as_slice())?;
        Ok(Self::with_index(Box::new(index), params))
    }

    /// Use an already built index.
    pub fn with_index(index: Box<dyn SpatialIndex>, params: &SplineParams) -> Self {
        Self {
            index,
            search: params.search,
            regularization: params.regularization,
        }
    }

    /// Fit a spline to the neighbours of `(x, y)` and evaluate it there.
    pub fn evaluate(&self, x: f64, y: f64) -> std::result::Result<f64, CellError> {
        let neighbours = self.search.select(self.index.as_ref(), x, y);
        let required = self.search.effective_min_points();
        if neighbours.len() < required {
            return Err(CellError::InsufficientNeighborhood {
                found: neighbours.len(),
                required,
            });
        }

        let local: Vec<SamplePoint> = neighbours.iter().map(|n| n.point).collect();
        let model =
            TpsModel::solve(&local, self.regularization).map_err(|_| CellError::Singular)?;
        Ok(model.evaluate(x, y))
    }
}

impl std::fmt::Debug for LocalSpline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSpline")
            .field("points", &self.index.len())
            .field("search", &self.search)
            .field("regularization", &self.regularization)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spike() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(10.0, 0.0, 10.0),
            SamplePoint::new(5.0, 5.0, 100.0),
            SamplePoint::new(0.0, 10.0, 10.0),
            SamplePoint::new(10.0, 10.0, 10.0),
        ]
    }

    #[test]
    fn test_tps_kernel_function() {
        assert!(tps_kernel(0.0).abs() < 1e-10, "U(0) should be 0");
        assert!(tps_kernel(1.0).abs() < 1e-10, "U(1) = 1·ln(1) = 0");
        assert_relative_eq!(tps_kernel(2.0), 4.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_exact_interpolation() {
        let pts = vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(10.0, 0.0, 20.0),
            SamplePoint::new(0.0, 10.0, 30.0),
            SamplePoint::new(10.0, 10.0, 40.0),
            SamplePoint::new(5.0, 5.0, 25.0),
            SamplePoint::new(2.0, 7.0, 33.0),
        ];
        let model = TpsModel::solve(&pts, 0.0).unwrap();
        for p in &pts {
            assert_relative_eq!(model.evaluate(p.x, p.y), p.value, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_linear_surface_reproduced() {
        let f = |x: f64, y: f64| 2.0 * x + 3.0 * y + 1.0;
        let pts: Vec<SamplePoint> = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (3.0, 7.0)]
            .iter()
            .map(|&(x, y)| SamplePoint::new(x, y, f(x, y)))
            .collect();
        let model = TpsModel::solve(&pts, 0.0).unwrap();
        for (x, y) in [(1.0, 1.0), (4.5, 8.2), (9.0, 2.0), (15.0, -3.0)] {
            assert_relative_eq!(model.evaluate(x, y), f(x, y), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_far_from_origin() {
        // Projected coordinates in the millions still solve
        let pts: Vec<SamplePoint> = spike()
            .into_iter()
            .map(|p| SamplePoint::new(p.x + 500_000.0, p.y + 4_000_000.0, p.value))
            .collect();
        let model = TpsModel::solve(&pts, 0.0).unwrap();
        assert_relative_eq!(model.evaluate(500_005.0, 4_000_005.0), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_regularization_increases_deviation() {
        let pts = spike();
        let mut last = -1.0;
        for reg in [0.0, 0.01, 0.1, 1.0, 10.0] {
            let model = TpsModel::solve(&pts, reg).unwrap();
            let deviation = (model.evaluate(5.0, 5.0) - 100.0).abs();
            assert!(deviation > last, "regularization {reg}: {deviation} <= {last}");
            last = deviation;
        }
    }

    #[test]
    fn test_collinear_points_are_singular() {
        let pts: Vec<SamplePoint> = (0..4).map(|i| SamplePoint::new(i as f64, 0.0, i as f64)).collect();
        assert!(matches!(TpsModel::solve(&pts, 0.0), Err(Error::SingularSystem(_))));
    }

    #[test]
    fn test_too_few_points() {
        let pts = vec![SamplePoint::new(0.0, 0.0, 10.0), SamplePoint::new(1.0, 0.0, 20.0)];
        assert!(matches!(
            TpsModel::solve(&pts, 0.0),
            Err(Error::InsufficientPoints { required: 3, found: 2 })
        ));
    }

    #[test]
    fn test_local_spline_neighbourhood() {
        let ps: PointSet = (0..10)
            .flat_map(|i| (0..10).map(move |j| SamplePoint::new(i as f64, j as f64, (i * j) as f64)))
            .collect();
        let params = SplineParams {
            search: SearchParams { radius: Some(2.0), max_points: Some(12), min_points: 3 },
            ..Default::default()
        };
        let local = LocalSpline::new(&ps, &params).unwrap();

        assert_relative_eq!(local.evaluate(4.0, 6.0).unwrap(), 24.0, epsilon = 1e-8);
        assert_eq!(
            local.evaluate(30.0, 30.0).unwrap_err(),
            CellError::InsufficientNeighborhood { found: 0, required: 3 }
        );
    }

    #[test]
    fn test_validate() {
        assert!(SplineParams::default().validate().is_ok());
        let bad = SplineParams { regularization: -0.5, ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
