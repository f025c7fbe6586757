//! # Configuration
//!
//! Conversion parameters and the JSON scene document consumed by the command line.
//!
//! A scene document carries the raw layers as nested arrays. JSON has no NaN, so missing
//! building heights are written as `null`:
//!
//! ```json
//! {
//!   "building_height": [[null, 0.0]],
//!   "building_segments": [[[[0.0, null]], []]],
//!   "land_cover": [[12, 0]],
//!   "elevation": [[3.0, 2.5]],
//!   "canopy_height": [[0.0, 9.0]],
//!   "config": { "voxel_size": 1.0 }
//! }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelCityError};
use crate::voxels::layers::{
    BuildingSegment, Grid2, RasterLayers, SegmentGrid, DEFAULT_MISSING_HEIGHT,
};

/// Default ratio of trunk height to total tree height.
pub const DEFAULT_TRUNK_HEIGHT_RATIO: f64 = 11.76 / 19.98;

/// Parameters of one raster-to-voxel conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Edge length of one voxel in meters
    pub voxel_size: f64,
    /// Fraction of a tree's height taken by the trunk, in `(0, 1)`
    pub trunk_height_ratio: f64,
    /// Height in meters substituted for NaN building heights and segment bounds
    pub missing_height_default: f64,
    /// Run column fill and per-layer meshing on the rayon pool
    pub parallel: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            voxel_size: 1.0,
            trunk_height_ratio: DEFAULT_TRUNK_HEIGHT_RATIO,
            missing_height_default: DEFAULT_MISSING_HEIGHT,
            parallel: true,
        }
    }
}

impl ConversionConfig {
    /// Checks that every parameter is inside its domain.
    pub fn validate(&self) -> Result<()> {
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(VoxelCityError::invalid_parameter(
                "voxel_size",
                self.voxel_size,
                "must be a positive finite number",
            ));
        }
        if !(self.trunk_height_ratio > 0.0 && self.trunk_height_ratio < 1.0) {
            return Err(VoxelCityError::invalid_parameter(
                "trunk_height_ratio",
                self.trunk_height_ratio,
                "must lie strictly between 0 and 1",
            ));
        }
        if !self.missing_height_default.is_finite() {
            return Err(VoxelCityError::invalid_parameter(
                "missing_height_default",
                self.missing_height_default,
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// The JSON input document of the `mesh` and `voxelize` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFile {
    pub building_height: Vec<Vec<Option<f64>>>,
    /// Per cell, a list of `[min, max]` pairs; may be omitted when there are no buildings
    #[serde(default)]
    pub building_segments: Option<Vec<Vec<Vec<[Option<f64>; 2]>>>>,
    /// 0-based land-cover classes
    pub land_cover: Vec<Vec<i32>>,
    pub elevation: Vec<Vec<f64>>,
    pub canopy_height: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    pub building_id: Option<Vec<Vec<u32>>>,
    #[serde(default)]
    pub config: ConversionConfig,
}

fn nan_for_null(rows: Vec<Vec<Option<f64>>>) -> Vec<Vec<f64>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        .collect()
}

impl SceneFile {
    /// Reads a scene document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Converts the document into raw layers and its conversion parameters.
    pub fn into_layers(self) -> Result<(RasterLayers, ConversionConfig)> {
        let building_height = Grid2::from_rows("building_height", nan_for_null(self.building_height))?;
        let (rows, cols) = building_height.shape();

        let building_segments = match self.building_segments {
            Some(cells) => SegmentGrid::from_rows(
                cells
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|cell| {
                                cell.into_iter()
                                    .map(|[min, max]| {
                                        BuildingSegment::new(
                                            min.unwrap_or(f64::NAN),
                                            max.unwrap_or(f64::NAN),
                                        )
                                    })
                                    .collect()
                            })
                            .collect()
                    })
                    .collect(),
            )?,
            None => SegmentGrid::empty(rows, cols),
        };

        // Absent canopy data means no tree rather than a missing height.
        let canopy_height = self
            .canopy_height
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(0.0)).collect())
            .collect();

        let building_id = self
            .building_id
            .map(|ids| Grid2::from_rows("building_id", ids))
            .transpose()?;

        let layers = RasterLayers {
            building_height,
            building_segments,
            land_cover: Grid2::from_rows("land_cover", self.land_cover)?,
            elevation: Grid2::from_rows("elevation", self.elevation)?,
            canopy_height: Grid2::from_rows("canopy_height", canopy_height)?,
            building_id,
        };
        Ok((layers, self.config))
    }
}

/// Reads a single 2D grid of numbers from a JSON file, with `null` read as NaN.
///
/// Used for the value and elevation inputs of the surface export.
pub fn load_value_grid(path: &Path, layer: &'static str) -> Result<Grid2<f64>> {
    let text = fs::read_to_string(path)?;
    let rows: Vec<Vec<Option<f64>>> = serde_json::from_str(&text)?;
    Grid2::from_rows(layer, nan_for_null(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConversionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.trunk_height_ratio - 0.5886).abs() < 1e-4);
        assert_eq!(config.missing_height_default, 10.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        let zero_size = ConversionConfig {
            voxel_size: 0.0,
            ..ConversionConfig::default()
        };
        assert!(matches!(
            zero_size.validate(),
            Err(VoxelCityError::InvalidParameter {
                name: "voxel_size",
                ..
            })
        ));

        let full_trunk = ConversionConfig {
            trunk_height_ratio: 1.0,
            ..ConversionConfig::default()
        };
        assert!(matches!(
            full_trunk.validate(),
            Err(VoxelCityError::InvalidParameter {
                name: "trunk_height_ratio",
                ..
            })
        ));
    }

    #[test]
    fn scene_nulls_become_nan() {
        let scene: SceneFile = serde_json::from_str(
            r#"{
                "building_height": [[null, 4.0]],
                "building_segments": [[[[0.0, null]], []]],
                "land_cover": [[2, 0]],
                "elevation": [[1.0, 2.0]],
                "canopy_height": [[null, 3.0]],
                "config": { "voxel_size": 2.0 }
            }"#,
        )
        .unwrap();

        let (layers, config) = scene.into_layers().unwrap();

        assert_eq!(config.voxel_size, 2.0);
        assert_eq!(config.trunk_height_ratio, DEFAULT_TRUNK_HEIGHT_RATIO);
        assert!(layers.building_height.get(0, 0).is_nan());
        assert!(layers.building_segments.segments_at(0, 0)[0].max_height.is_nan());
        assert!(layers.building_segments.segments_at(0, 1).is_empty());
        assert_eq!(*layers.canopy_height.get(0, 0), 0.0);
    }

    #[test]
    fn value_grids_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        fs::write(&path, "[[1.5, null], [0.0, 2.0]]").unwrap();

        let grid = load_value_grid(&path, "values").unwrap();

        assert_eq!(grid.shape(), (2, 2));
        assert!(grid.get(0, 1).is_nan());
        assert_eq!(*grid.get(1, 1), 2.0);
    }
}
