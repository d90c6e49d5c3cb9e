//! Cell addressing for regular grids

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned bounding rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Smallest extent containing every `(x, y)` pair, or `None` for an empty iterator.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        coords.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Extent::new(x, y, x, y),
                Some(e) => Extent::new(e.x_min.min(x), e.y_min.min(y), e.x_max.max(x), e.y_max.max(y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Inclusive containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Geometry of a regular grid of square cells.
///
/// `origin_x`/`origin_y` are the coordinates of the *centre* of cell (0, 0).
/// Columns grow eastwards and rows grow northwards:
/// ```text
/// x = origin_x + col * cell_size
/// y = origin_y + row * cell_size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// X coordinate of the centre of cell (0, 0)
    pub origin_x: f64,
    /// Y coordinate of the centre of cell (0, 0)
    pub origin_y: f64,
    /// Edge length of a cell
    pub cell_size: f64,
    /// Number of columns
    pub nx: usize,
    /// Number of rows
    pub ny: usize,
}

impl GridSpec {
    /// Create a validated grid specification.
    pub fn new(origin_x: f64, origin_y: f64, cell_size: f64, nx: usize, ny: usize) -> Result<Self> {
        let spec = Self {
            origin_x,
            origin_y,
            cell_size,
            nx,
            ny,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Fit a grid to an extent: the lower-left corner becomes the centre of
    /// cell (0, 0) and as many whole cells as fit are added in each direction.
    pub fn from_extent(extent: Extent, cell_size: f64) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(Error::InvalidGrid(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        if !(extent.width() >= 0.0) || !(extent.height() >= 0.0) {
            return Err(Error::InvalidGrid(format!(
                "extent is inverted: x [{}, {}], y [{}, {}]",
                extent.x_min, extent.x_max, extent.y_min, extent.y_max
            )));
        }

        // Tolerance keeps extents that are an exact multiple of the cell size
        // from losing their last column to rounding.
        let nx = cells_along(extent.width(), cell_size)?;
        let ny = cells_along(extent.height(), cell_size)?;
        if nx.checked_mul(ny).is_none() {
            return Err(Error::InvalidGrid(format!(
                "grid too large: {nx}x{ny} cells"
            )));
        }

        Self::new(extent.x_min, extent.y_min, cell_size, nx, ny)
    }

    /// Check the grid invariants: positive cell size and dimensions.
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0) || !self.cell_size.is_finite() {
            return Err(Error::InvalidGrid(format!(
                "cell size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(Error::InvalidGrid(format!(
                "dimensions must be positive, got {}x{}",
                self.nx, self.ny
            )));
        }
        if self.nx.checked_mul(self.ny).is_none() {
            return Err(Error::InvalidGrid(format!(
                "grid too large: {}x{} cells",
                self.nx, self.ny
            )));
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(Error::InvalidGrid("origin must be finite".into()));
        }
        Ok(())
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    /// World coordinate of the centre of cell `(col, row)`.
    #[inline]
    pub fn cell_to_world(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.cell_size,
            self.origin_y + row as f64 * self.cell_size,
        )
    }

    /// Fractional cell coordinates `(col, row)` of a world position.
    ///
    /// Cell centres map to whole numbers; use `.round()` for the nearest cell.
    #[inline]
    pub fn world_to_cell(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.cell_size,
            (y - self.origin_y) / self.cell_size,
        )
    }

    /// Extent spanned by cell centres.
    pub fn center_extent(&self) -> Extent {
        let (x_max, y_max) = self.cell_to_world(self.nx - 1, self.ny - 1);
        Extent::new(self.origin_x, self.origin_y, x_max, y_max)
    }

    /// Extent spanned by cell edges (centre extent grown by half a cell).
    pub fn edge_extent(&self) -> Extent {
        let c = self.center_extent();
        let h = 0.5 * self.cell_size;
        Extent::new(c.x_min - h, c.y_min - h, c.x_max + h, c.y_max + h)
    }

    /// Whether `(col, row)` addresses a cell of this grid.
    #[inline]
    pub fn contains_cell(&self, col: isize, row: isize) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.nx && (row as usize) < self.ny
    }
}

/// Number of cell centres along a side of length `length`.
fn cells_along(length: f64, cell_size: f64) -> Result<usize> {
    let steps = (length / cell_size + 1e-9).floor();
    if !steps.is_finite() || steps >= usize::MAX as f64 {
        return Err(Error::InvalidGrid(format!(
            "grid too large: {length} / {cell_size} cells along one side"
        )));
    }
    (steps as usize)
        .checked_add(1)
        .ok_or_else(|| Error::InvalidGrid("grid too large".into()))
}
