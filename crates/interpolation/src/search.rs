//! Neighbour search over a point set
//!
//! The estimators only see the [`SpatialIndex`] trait; [`KdTree`](crate::KdTree)
//! is the implementation shipped with this crate.

use serde::{Deserialize, Serialize};

use scatterfill_core::{Error, Result};

use crate::points::SamplePoint;

/// One neighbour returned by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the point in the indexed point set
    pub index: usize,
    pub point: SamplePoint,
    pub distance_sq: f64,
}

/// Read-only neighbour queries over an indexed point set.
///
/// Building an index may mutate internal state, but once built every query
/// must be safe to call from several threads at once.
pub trait SpatialIndex: Send + Sync {
    /// Number of indexed points.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` points closest to `(x, y)`, sorted by ascending distance.
    fn k_nearest(&self, x: f64, y: f64, k: usize) -> Vec<Neighbor>;

    /// All points within `radius` of `(x, y)`, in no particular order.
    fn within_radius(&self, x: f64, y: f64, radius: f64) -> Vec<Neighbor>;
}

/// Neighbourhood selection for the local spline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Maximum distance of a neighbour. `None` = unbounded.
    pub radius: Option<f64>,
    /// Maximum number of neighbours, nearest first. `None` = unbounded.
    pub max_points: Option<usize>,
    /// Minimum number of neighbours for a query to be estimated; never below 3.
    pub min_points: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            radius: None,
            max_points: Some(20),
            min_points: 3,
        }
    }
}

impl SearchParams {
    /// Smallest neighbourhood a spline can be fitted to.
    pub const MIN_NEIGHBORS: usize = 3;

    pub fn validate(&self) -> Result<()> {
        if let Some(r) = self.radius
            && !(r > 0.0 && r.is_finite())
        {
            return Err(Error::invalid_parameter("search.radius", r, "must be positive"));
        }
        if let Some(k) = self.max_points
            && k < self.effective_min_points()
        {
            return Err(Error::invalid_parameter(
                "search.max_points",
                k,
                format!("must be at least {}", self.effective_min_points()),
            ));
        }
        Ok(())
    }

    /// `min_points`, raised to [`Self::MIN_NEIGHBORS`].
    pub fn effective_min_points(&self) -> usize {
        self.min_points.max(Self::MIN_NEIGHBORS)
    }

    /// Neighbours of `(x, y)` under this radius/count configuration.
    pub fn select(&self, index: &dyn SpatialIndex, x: f64, y: f64) -> Vec<Neighbor> {
        match (self.radius, self.max_points) {
            (Some(radius), Some(k)) => {
                let r_sq = radius * radius;
                let mut found = index.k_nearest(x, y, k);
                found.retain(|n| n.distance_sq <= r_sq);
                found
            }
            (Some(radius), None) => index.within_radius(x, y, radius),
            (None, Some(k)) => index.k_nearest(x, y, k),
            (None, None) => index.k_nearest(x, y, index.len()),
        }
    }
}
