//! # Conversion Errors
//!
//! Error types for the raster-to-voxel-to-mesh pipeline.
//!
//! Every fatal condition is raised before the step that would produce an artifact: shape
//! mismatches before any voxel write, material and range problems before any file write.
//! Recoverable conditions (NaN building heights, unmapped voxel codes) never surface here;
//! they are substituted locally and logged.

use thiserror::Error;

/// Errors that can occur while normalizing layers, compositing voxels or exporting meshes.
#[derive(Debug, Error)]
pub enum VoxelCityError {
    /// Two input layers disagree in shape
    #[error("Shape mismatch in layer '{layer}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        layer: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// The requested palette or colormap is unknown, or a custom table is malformed
    #[error("Invalid material table: {message}")]
    InvalidMaterialTable { message: String },

    /// A value-to-colour normalization was requested over an empty range
    #[error("Degenerate value range: min and max are both {min}")]
    DegenerateRange { min: f64, max: f64 },

    /// A scalar parameter is outside its valid domain
    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// An elevation cell is NaN or infinite
    #[error("Elevation at row {row}, column {col} is not finite")]
    NonFiniteElevation { row: usize, col: usize },

    /// A building height, segment bound or canopy height is infinite
    #[error("Layer '{layer}' at row {row}, column {col} is infinite")]
    InfiniteHeight {
        layer: &'static str,
        row: usize,
        col: usize,
    },

    /// A land-cover class falls outside `0..i32::MAX`
    #[error("Land-cover class {code} at row {row}, column {col} is out of range")]
    InvalidLandCover { row: usize, col: usize, code: i32 },

    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be parsed or produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoxelCityError {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(
        layer: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        Self::ShapeMismatch {
            layer,
            expected,
            found,
        }
    }

    /// Creates an invalid material table error.
    pub fn invalid_material_table(message: impl Into<String>) -> Self {
        Self::InvalidMaterialTable {
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VoxelCityError>;
