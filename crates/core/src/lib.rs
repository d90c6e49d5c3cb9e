//! # Scatterfill Core
//!
//! Core types for the Scatterfill point-to-grid interpolation library.
//!
//! This crate provides:
//! - `GridSpec`: Cell addressing of a regular grid
//! - `Raster`: Georeferenced `f64` grid with missing-data handling
//! - `Resampling`: Reading rasters between cell centres
//! - `FeatureCollection`: Point features with attribute tables
//! - `Error`: Fatal error taxonomy shared by all crates

pub mod error;
pub mod raster;
pub mod vector;

pub use error::{Error, ErrorKind, Result};
pub use raster::{Extent, GridSpec, Raster, Resampling};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::raster::{Extent, GridSpec, Raster, Resampling};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
