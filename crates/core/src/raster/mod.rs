//! Raster data structures and operations

mod grid;
mod grid_spec;
mod resample;

pub use grid::Raster;
pub use grid_spec::{Extent, GridSpec};
pub use resample::Resampling;
