//! Global kriging with auxiliary covariates and coordinate trend
//!
//! One system is assembled over every sample point, inverted once, and then
//! each query only costs a matrix-vector product:
//! ```text
//! [γ(xᵢ,xⱼ)  1  aₖ(xᵢ)  xᵢ  yᵢ] [λ]   [γ(xᵢ,x₀)]
//! [1ᵀ        0  0       0   0 ] [μ] = [1       ]
//! [aₖᵀ       0  0       0   0 ]       [aₖ(x₀)  ]
//! [xᵀ, yᵀ    0  0       0   0 ]       [x₀, y₀  ]
//! ```
//! where γ is a fixed [`WeightFunction`], `aₖ` are auxiliary grids resampled
//! at the point locations, and the x/y rows are present only with the
//! coordinate trend enabled.
//!
//! Reference:
//! Matheron, G. (1969). Le Krigeage Universel. Cahiers du CMMM.
//! Hengl, T. et al. (2007). About regression-kriging. Computers & Geosciences, 33(10).

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scatterfill_core::{Error, Raster, Resampling, Result};

use crate::estimator::{CellError, Estimate};
use crate::linalg;
use crate::points::{PointSet, SamplePoint};
use crate::weight::WeightFunction;

/// Parameters for the global kriging estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalKrigingParams {
    /// Weight (semivariance) as a function of distance
    pub weight: WeightFunction,
    /// Add x and y as drift terms
    pub include_coordinate_trend: bool,
    /// How auxiliary grids are read at point and cell locations
    pub aux_resampling: Resampling,
    /// Edge length of the estimation block. `None` = point kriging.
    pub block_size: Option<f64>,
}

impl Default for GlobalKrigingParams {
    fn default() -> Self {
        Self {
            weight: WeightFunction::default(),
            include_coordinate_trend: false,
            aux_resampling: Resampling::BSpline,
            block_size: None,
        }
    }
}

impl GlobalKrigingParams {
    pub fn validate(&self) -> Result<()> {
        self.weight.validate()?;
        if let Some(b) = self.block_size
            && !(b > 0.0 && b.is_finite())
        {
            return Err(Error::invalid_parameter("block_size", b, "must be positive"));
        }
        Ok(())
    }

    fn coord_terms(&self) -> usize {
        if self.include_coordinate_trend { 2 } else { 0 }
    }
}

/// Assembled and inverted global kriging system.
///
/// Immutable once built; evaluation only reads it, so one instance is
/// shared by every worker during a run.
#[derive(Debug)]
pub struct KrigingSystem<'a> {
    points: Vec<SamplePoint>,
    aux: &'a [Raster],
    params: GlobalKrigingParams,
    weights: Array2<f64>,
    inverse: Array2<f64>,
}

impl<'a> KrigingSystem<'a> {
    /// Build and invert the weight matrix.
    ///
    /// Points not covered by every auxiliary grid are left out. Fails if
    /// fewer than `max(3, 1 + aux + coords)` points remain or the matrix is
    /// not invertible.
    pub fn initialize(
        points: &PointSet,
        aux: &'a [Raster],
        params: &GlobalKrigingParams,
    ) -> Result<Self> {
        params.validate()?;

        let mut kept = Vec::with_capacity(points.len());
        let mut aux_values = Vec::with_capacity(points.len() * aux.len());
        for p in points {
            let sampled: Option<Vec<f64>> = aux
                .iter()
                .map(|grid| grid.sample(p.x, p.y, params.aux_resampling))
                .collect();
            if let Some(values) = sampled {
                kept.push(*p);
                aux_values.extend(values);
            }
        }

        let dropped = points.len() - kept.len();
        if dropped > 0 {
            warn!(
                dropped,
                kept = kept.len(),
                "sample points outside auxiliary grid coverage left out"
            );
        }

        let n = kept.len();
        let n_aux = aux.len();
        let n_coords = params.coord_terms();
        let required = 3.max(1 + n_aux + n_coords);
        if n < required {
            return Err(Error::InsufficientPoints { required, found: n });
        }

        let order = n + 1 + n_aux + n_coords;
        let mut w = Array2::<f64>::zeros((order, order));

        for i in 0..n {
            for j in (i + 1)..n {
                let g = params
                    .weight
                    .evaluate(kept[i].dist(kept[j].x, kept[j].y));
                w[(i, j)] = g;
                w[(j, i)] = g;
            }

            w[(i, n)] = 1.0;
            w[(n, i)] = 1.0;

            for k in 0..n_aux {
                let v = aux_values[i * n_aux + k];
                w[(i, n + 1 + k)] = v;
                w[(n + 1 + k, i)] = v;
            }

            if n_coords > 0 {
                let c = n + 1 + n_aux;
                w[(i, c)] = kept[i].x;
                w[(c, i)] = kept[i].x;
                w[(i, c + 1)] = kept[i].y;
                w[(c + 1, i)] = kept[i].y;
            }
        }

        let inverse = linalg::invert(&w).map_err(|e| match e {
            Error::SingularSystem(msg) => {
                Error::SingularSystem(format!("kriging weight matrix: {msg}"))
            }
            other => other,
        })?;

        debug!(points = n, aux = n_aux, order, "kriging system inverted");

        Ok(Self {
            points: kept,
            aux,
            params: *params,
            weights: w,
            inverse,
        })
    }

    /// Estimate and variance at `(x, y)`.
    ///
    /// The variance is `Σⱼ λⱼ·gⱼ` over the full right-hand side, which is 0
    /// at a sample location.
    pub fn evaluate(&self, x: f64, y: f64) -> std::result::Result<Estimate, CellError> {
        let g = self.rhs(x, y)?;
        let lambda = self.inverse.dot(&g);

        let value = self
            .points
            .iter()
            .zip(lambda.iter())
            .map(|(p, l)| l * p.value)
            .sum();
        let variance = lambda.dot(&g);

        Ok(Estimate {
            value,
            variance: Some(variance),
        })
    }

    fn rhs(&self, x: f64, y: f64) -> std::result::Result<Array1<f64>, CellError> {
        let n = self.points.len();
        let mut g = Array1::<f64>::zeros(self.order());

        for (gi, p) in g.iter_mut().zip(&self.points) {
            *gi = self.point_weight(p, x, y);
        }
        g[n] = 1.0;

        for (k, grid) in self.aux.iter().enumerate() {
            g[n + 1 + k] = grid
                .sample(x, y, self.params.aux_resampling)
                .ok_or(CellError::Coverage { grid: k })?;
        }

        if self.params.include_coordinate_trend {
            let c = n + 1 + self.aux.len();
            g[c] = x;
            g[c + 1] = y;
        }

        Ok(g)
    }

    /// Weight between a sample and the query, averaged over the block
    /// centre and its four corners in block mode.
    #[inline]
    fn point_weight(&self, p: &SamplePoint, x: f64, y: f64) -> f64 {
        let gamma = |qx: f64, qy: f64| self.params.weight.evaluate(p.dist(qx, qy));
        match self.params.block_size {
            None => gamma(x, y),
            Some(b) => {
                let d = 0.5 * b;
                (gamma(x, y)
                    + gamma(x - d, y - d)
                    + gamma(x - d, y + d)
                    + gamma(x + d, y - d)
                    + gamma(x + d, y + d))
                    / 5.0
            }
        }
    }

    /// Number of sample points in the system.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Order of the weight matrix.
    pub fn order(&self) -> usize {
        self.weights.nrows()
    }

    /// The assembled (un-inverted) weight matrix.
    pub fn weight_matrix(&self) -> &Array2<f64> {
        &self.weights
    }

    /// The cached inverse of [`Self::weight_matrix`].
    pub fn inverse(&self) -> &Array2<f64> {
        &self.inverse
    }
}
