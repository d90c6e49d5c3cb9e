//! Sample points and their extraction from features or rasters

use serde::{Deserialize, Serialize};
use tracing::debug;

use scatterfill_core::{Error, Extent, FeatureCollection, Raster, Result};

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }
}

/// Insertion-ordered collection of sample points.
///
/// Built once before a run and read-only afterwards. Duplicate coordinates
/// are allowed; they surface later as singular systems if they matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<SamplePoint>,
}

impl PointSet {
    pub fn new(points: Vec<SamplePoint>) -> Self {
        Self { points }
    }

    /// Read `(x, y, attribute)` triples from point features.
    ///
    /// Features without a point location or whose attribute is missing or
    /// non-numeric are skipped. Asking for an attribute no feature carries is
    /// a configuration error.
    pub fn from_features(features: &FeatureCollection, attribute: &str) -> Result<Self> {
        if !features.is_empty() && !features.has_attribute(attribute) {
            return Err(Error::invalid_parameter(
                "attribute",
                attribute,
                "no feature carries this attribute",
            ));
        }

        let points: Vec<SamplePoint> = features
            .iter()
            .filter_map(|f| {
                let (x, y) = f.location()?;
                let value = f.get_property(attribute)?.as_f64()?;
                Some(SamplePoint::new(x, y, value))
            })
            .collect();

        debug!(
            attribute,
            usable = points.len(),
            skipped = features.len() - points.len(),
            "extracted sample points from features"
        );

        Ok(Self { points })
    }

    /// Every non-missing cell of `raster` becomes a sample at its cell centre.
    pub fn from_raster(raster: &Raster) -> Self {
        let points: Vec<SamplePoint> = raster
            .valid_cells()
            .map(|(col, row, v)| {
                let (x, y) = raster.cell_to_world(col, row);
                SamplePoint::new(x, y, v)
            })
            .collect();

        debug!(
            usable = points.len(),
            skipped = raster.len() - points.len(),
            "extracted sample points from raster"
        );

        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SamplePoint> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&SamplePoint> {
        self.points.get(index)
    }

    /// Bounding extent of the point coordinates.
    pub fn extent(&self) -> Option<Extent> {
        Extent::from_coords(self.points.iter().map(|p| (p.x, p.y)))
    }

    /// Smallest and largest value.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.value, p.value)),
            Some((lo, hi)) => Some((lo.min(p.value), hi.max(p.value))),
        })
    }

    /// Points whose index satisfies `keep`, in their original order.
    pub fn filter_indexed<F>(&self, mut keep: F) -> PointSet
    where
        F: FnMut(usize, &SamplePoint) -> bool,
    {
        self.points
            .iter()
            .enumerate()
            .filter(|(i, p)| keep(*i, *p))
            .map(|(_, p)| *p)
            .collect()
    }

    /// Copy of the set with every value passed through `f`.
    pub fn map_values<F>(&self, f: F) -> PointSet
    where
        F: Fn(f64) -> f64,
    {
        self.points
            .iter()
            .map(|p| SamplePoint::new(p.x, p.y, f(p.value)))
            .collect()
    }
}

impl From<Vec<SamplePoint>> for PointSet {
    fn from(points: Vec<SamplePoint>) -> Self {
        Self { points }
    }
}

impl FromIterator<SamplePoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = SamplePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a SamplePoint;
    type IntoIter = std::slice::Iter<'a, SamplePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Logarithmic value transform anchored at the smallest sample value.
///
/// `forward(z) = ln(1 + z − z_min)`, `inverse(v) = exp(v) − 1 + z_min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogTransform {
    z_min: f64,
}

impl LogTransform {
    /// Anchor the transform at the smallest value of `points`.
    pub fn fit(points: &PointSet) -> Option<Self> {
        points.value_range().map(|(z_min, _)| Self { z_min })
    }

    #[inline]
    pub fn forward(&self, z: f64) -> f64 {
        (1.0 + z - self.z_min).ln()
    }

    #[inline]
    pub fn inverse(&self, v: f64) -> f64 {
        v.exp() - 1.0 + self.z_min
    }

    pub fn apply(&self, points: &PointSet) -> PointSet {
        points.map_values(|z| self.forward(z))
    }
}
