//! Output grid geometry

use serde::{Deserialize, Serialize};

use scatterfill_core::{Error, Extent, GridSpec, Result};

use crate::points::PointSet;

/// Where the output grid comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetGrid {
    /// Explicit bounds, fitted with whole cells of `cell_size`
    Bounds { extent: Extent, cell_size: f64 },
    /// Geometry of an existing grid
    Reference(GridSpec),
    /// Bounding extent of the input points
    PointsExtent { cell_size: f64 },
}

impl Default for TargetGrid {
    fn default() -> Self {
        TargetGrid::PointsExtent { cell_size: 1.0 }
    }
}

impl TargetGrid {
    pub fn validate(&self) -> Result<()> {
        match self {
            TargetGrid::Bounds { cell_size, .. } | TargetGrid::PointsExtent { cell_size } => {
                if *cell_size > 0.0 && cell_size.is_finite() {
                    Ok(())
                } else {
                    Err(Error::invalid_parameter("cell_size", cell_size, "must be positive"))
                }
            }
            TargetGrid::Reference(spec) => spec.validate(),
        }
    }

    /// Resolve to a validated grid; `points` is only read for
    /// [`TargetGrid::PointsExtent`].
    pub fn resolve(&self, points: &PointSet) -> Result<GridSpec> {
        self.validate()?;

        match *self {
            TargetGrid::Bounds { extent, cell_size } => GridSpec::from_extent(extent, cell_size),
            TargetGrid::Reference(spec) => Ok(spec),
            TargetGrid::PointsExtent { cell_size } => {
                let extent = points.extent().ok_or_else(|| {
                    Error::InvalidGrid("cannot derive an extent from an empty point set".into())
                })?;
                GridSpec::from_extent(extent, cell_size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::SamplePoint;

    #[test]
    fn test_bounds() {
        let target = TargetGrid::Bounds {
            extent: Extent::new(0.0, 0.0, 100.0, 50.0),
            cell_size: 10.0,
        };
        let spec = target.resolve(&PointSet::default()).unwrap();
        assert_eq!((spec.nx, spec.ny), (11, 6));
        assert_eq!(spec.cell_to_world(0, 0), (0.0, 0.0));
        assert_eq!(spec.cell_to_world(10, 5), (100.0, 50.0));
    }

    #[test]
    fn test_points_extent() {
        let ps: PointSet = vec![
            SamplePoint::new(2.0, 3.0, 0.0),
            SamplePoint::new(6.5, 5.0, 0.0),
        ]
        .into();
        let spec = TargetGrid::PointsExtent { cell_size: 1.0 }.resolve(&ps).unwrap();
        assert_eq!((spec.origin_x, spec.origin_y), (2.0, 3.0));
        assert_eq!((spec.nx, spec.ny), (5, 3));

        assert!(matches!(
            TargetGrid::PointsExtent { cell_size: 1.0 }.resolve(&PointSet::default()),
            Err(Error::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_reference() {
        let spec = GridSpec::new(5.0, 5.0, 2.0, 4, 3).unwrap();
        assert_eq!(TargetGrid::Reference(spec).resolve(&PointSet::default()).unwrap(), spec);

        let broken = GridSpec { nx: 0, ..spec };
        assert!(TargetGrid::Reference(broken).resolve(&PointSet::default()).is_err());
    }

    #[test]
    fn test_invalid_cell_size() {
        for cell_size in [0.0, -1.0, f64::NAN] {
            let target = TargetGrid::PointsExtent { cell_size };
            assert_eq!(
                target.validate().unwrap_err().kind(),
                scatterfill_core::ErrorKind::Configuration
            );
        }
    }
}
