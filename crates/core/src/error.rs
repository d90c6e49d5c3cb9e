//! Error types for Scatterfill

use thiserror::Error;

/// Main error type for Scatterfill operations.
///
/// Every variant is fatal to the run that produced it. Failures that only
/// affect a single output cell are modelled separately by the interpolation
/// crate and never surface as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grid geometry: {0}")]
    InvalidGrid(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Not enough points for interpolation: {found} usable, {required} required")]
    InsufficientPoints { required: usize, found: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Singular system: {0}")]
    SingularSystem(String),

    #[error("Search index error: {0}")]
    SearchIndex(String),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a fatal [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid geometry, parameters or too few points; raised before any cell is evaluated.
    Configuration,
    /// A linear system that must be solved for the whole run is not solvable.
    Numerical,
    /// A supporting structure (the search index) could not be built.
    Resource,
    /// The progress observer asked the run to stop.
    Cancelled,
}

impl Error {
    /// Which class of fatal failure this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidGrid(_)
            | Error::InvalidParameter { .. }
            | Error::InsufficientPoints { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::SizeMismatch { .. } => ErrorKind::Configuration,
            Error::SingularSystem(_) => ErrorKind::Numerical,
            Error::SearchIndex(_) | Error::Other(_) => ErrorKind::Resource,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Shorthand for an [`Error::InvalidParameter`].
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Scatterfill operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::InsufficientPoints { required: 3, found: 2 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::SingularSystem("x".into()).kind(),
            ErrorKind::Numerical
        );
        assert_eq!(Error::SearchIndex("empty".into()).kind(), ErrorKind::Resource);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_messages() {
        let e = Error::InsufficientPoints { required: 3, found: 2 };
        assert_eq!(
            e.to_string(),
            "Not enough points for interpolation: 2 usable, 3 required"
        );
        let e = Error::invalid_parameter("cell_size", -1.0, "must be positive");
        assert_eq!(e.to_string(), "Invalid parameter: cell_size = -1 (must be positive)");
    }
}
