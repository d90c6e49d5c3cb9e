//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{Extent, GridSpec};
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// A georeferenced 2D grid of `f64` values.
///
/// Data are stored as `(row, col)` with row 0 at `spec.origin_y`, i.e. the
/// southernmost row comes first. NaN is always treated as missing-data; an
/// additional sentinel may be declared with [`Raster::set_nodata`].
///
/// # Example
///
/// ```ignore
/// use scatterfill_core::{GridSpec, Raster};
///
/// let spec = GridSpec::new(0.0, 0.0, 10.0, 100, 100)?;
/// let mut raster = Raster::new(spec);
/// raster.set(10, 20, 42.0)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster {
    /// Raster data stored in row-major order (row, col)
    data: Array2<f64>,
    /// Cell addressing
    spec: GridSpec,
    /// Explicit no-data sentinel (NaN is always no-data)
    nodata: Option<f64>,
}

impl Raster {
    /// Create a new raster filled with zeros
    pub fn new(spec: GridSpec) -> Self {
        Self {
            data: Array2::zeros((spec.ny, spec.nx)),
            spec,
            nodata: None,
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(spec: GridSpec, value: f64) -> Self {
        Self {
            data: Array2::from_elem((spec.ny, spec.nx), value),
            spec,
            nodata: None,
        }
    }

    /// Create a raster from an existing array whose shape must be `(ny, nx)`.
    pub fn from_array(spec: GridSpec, data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows != spec.ny || cols != spec.nx {
            return Err(Error::SizeMismatch {
                er: spec.ny,
                ec: spec.nx,
                ar: rows,
                ac: cols,
            });
        }
        Ok(Self {
            data,
            spec,
            nodata: None,
        })
    }

    /// Create a raster from row-major values (`ny * nx` of them).
    pub fn from_vec(spec: GridSpec, data: Vec<f64>) -> Result<Self> {
        if data.len() != spec.cell_count() {
            return Err(Error::SizeMismatch {
                er: spec.ny,
                ec: spec.nx,
                ar: data.len() / spec.nx.max(1),
                ac: spec.nx,
            });
        }
        let array = Array2::from_shape_vec((spec.ny, spec.nx), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Self::from_array(spec, array)
    }

    /// Create a raster by evaluating `f(x, y)` at every cell centre.
    pub fn from_fn<F>(spec: GridSpec, mut f: F) -> Self
    where
        F: FnMut(f64, f64) -> f64,
    {
        let data = Array2::from_shape_fn((spec.ny, spec.nx), |(row, col)| {
            let (x, y) = spec.cell_to_world(col, row);
            f(x, y)
        });
        Self {
            data,
            spec,
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Value at a signed cell address, `None` if outside the grid or missing-data.
    #[inline]
    pub fn valid_at(&self, col: isize, row: isize) -> Option<f64> {
        if !self.spec.contains_cell(col, row) {
            return None;
        }
        let v = self.data[(row as usize, col as usize)];
        if self.is_nodata(v) { None } else { Some(v) }
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    // Metadata

    /// Cell addressing of this raster
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    /// Cell size
    pub fn cell_size(&self) -> f64 {
        self.spec.cell_size
    }

    /// Extent covered by the cells (edge to edge)
    pub fn extent(&self) -> Extent {
        self.spec.edge_extent()
    }

    /// World coordinate of the centre of cell `(col, row)`
    pub fn cell_to_world(&self, col: usize, row: usize) -> (f64, f64) {
        self.spec.cell_to_world(col, row)
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(nd) => (value - nd).abs() < f64::EPSILON * 100.0,
            None => false,
        }
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    /// Iterate over `(col, row, value)` for every cell holding data.
    pub fn valid_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.data
            .indexed_iter()
            .filter(|&(_, &v)| !self.is_nodata(v))
            .map(|((row, col), &v)| (col, row, v))
    }

    /// Number of cells holding data
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }
}
