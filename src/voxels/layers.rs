//! # Layer Normalization Module
//!
//! This module holds the 2D raster layers that feed the voxel compositor and the
//! normalizer that aligns them to one orientation and shape.
//!
//! ## Layers
//!
//! * **Building height**: meters above local ground, NaN where the footprint has no height data
//! * **Building segments**: per-column list of `(min, max)` height intervals
//! * **Land cover**: classification codes, 0-based as delivered by the land-cover source
//! * **Elevation**: terrain height in meters
//! * **Canopy height**: tree height in meters, 0 where there is no tree
//! * **Building id** (optional): footprint identifier used to flatten terrain under buildings
//!
//! ## Storage
//!
//! Grids are stored row-major in a flat `Vec`. The per-column segment lists use a flattened arena:
//! one `(start, count)` span per cell pointing into a single segment vector, so no nested
//! allocation is needed per cell.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelCityError};

/// Default height in meters substituted for missing building heights.
pub const DEFAULT_MISSING_HEIGHT: f64 = 10.0;

/// A dense 2D grid stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid2<T> {
    /// Creates a grid of the given shape filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Grid2 {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Builds a grid from nested rows.
    ///
    /// # Arguments
    /// * `layer` - Name of the layer, used in the error if rows are ragged
    /// * `rows` - The row vectors, all of equal length
    ///
    /// # Returns
    /// The grid, or `ShapeMismatch` if any row length differs from the first.
    pub fn from_rows(layer: &'static str, rows: Vec<Vec<T>>) -> Result<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(row_count * col_count);
        for row in rows {
            if row.len() != col_count {
                return Err(VoxelCityError::shape_mismatch(
                    layer,
                    (row_count, col_count),
                    (row_count, row.len()),
                ));
            }
            data.extend(row);
        }
        Ok(Grid2 {
            rows: row_count,
            cols: col_count,
            data,
        })
    }

    /// Returns a copy of the grid with its row order reversed.
    pub fn flipped_vertically(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for row in (0..self.rows).rev() {
            data.extend_from_slice(&self.data[row * self.cols..(row + 1) * self.cols]);
        }
        Grid2 {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

impl<T> Grid2<T> {
    /// The `(rows, cols)` shape of the grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// All cells in row-major order.
    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// The `(row, col)` of the first cell, in row-major order, matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&T) -> bool) -> Option<(usize, usize)> {
        self.data
            .iter()
            .position(predicate)
            .map(|index| (index / self.cols, index % self.cols))
    }
}

/// One vertical building interval of a column, in meters relative to local ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingSegment {
    pub min_height: f64,
    pub max_height: f64,
}

impl BuildingSegment {
    pub fn new(min_height: f64, max_height: f64) -> Self {
        BuildingSegment {
            min_height,
            max_height,
        }
    }

    /// Returns the segment with NaN bounds replaced by `default`, and whether anything changed.
    pub fn with_missing_replaced(self, default: f64) -> (Self, bool) {
        let mut replaced = false;
        let mut fix = |value: f64| {
            if value.is_nan() {
                replaced = true;
                default
            } else {
                value
            }
        };
        let segment = BuildingSegment::new(fix(self.min_height), fix(self.max_height));
        (segment, replaced)
    }
}

/// Per-column building segment lists stored as a flattened arena.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGrid {
    rows: usize,
    cols: usize,
    /// `(start, count)` into `segments` for every cell, row-major
    spans: Vec<(u32, u32)>,
    segments: Vec<BuildingSegment>,
}

impl SegmentGrid {
    /// Creates a grid where no column has any building segment.
    pub fn empty(rows: usize, cols: usize) -> Self {
        SegmentGrid {
            rows,
            cols,
            spans: vec![(0, 0); rows * cols],
            segments: Vec::new(),
        }
    }

    /// Builds the arena from nested `rows -> cols -> segments` lists.
    pub fn from_rows(rows: Vec<Vec<Vec<BuildingSegment>>>) -> Result<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map_or(0, Vec::len);
        let mut grid = SegmentGrid {
            rows: row_count,
            cols: col_count,
            spans: Vec::with_capacity(row_count * col_count),
            segments: Vec::new(),
        };
        for row in rows {
            if row.len() != col_count {
                return Err(VoxelCityError::shape_mismatch(
                    "building_segments",
                    (row_count, col_count),
                    (row_count, row.len()),
                ));
            }
            for cell in row {
                grid.push_cell(&cell);
            }
        }
        Ok(grid)
    }

    fn push_cell(&mut self, cell: &[BuildingSegment]) {
        let start = self.segments.len() as u32;
        self.segments.extend_from_slice(cell);
        self.spans.push((start, cell.len() as u32));
    }

    /// Replaces the segment list of one column.
    ///
    /// The previous segments of the column stay in the arena unreferenced; callers building large
    /// grids should prefer [`SegmentGrid::from_rows`].
    pub fn set_segments(&mut self, row: usize, col: usize, cell: &[BuildingSegment]) {
        let start = self.segments.len() as u32;
        self.segments.extend_from_slice(cell);
        self.spans[row * self.cols + col] = (start, cell.len() as u32);
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The ordered segments owned by column `(row, col)`.
    pub fn segments_at(&self, row: usize, col: usize) -> &[BuildingSegment] {
        let (start, count) = self.spans[row * self.cols + col];
        &self.segments[start as usize..(start + count) as usize]
    }

    /// The first column, in row-major order, owning a segment that matches `predicate`.
    pub fn position(&self, predicate: impl Fn(&BuildingSegment) -> bool) -> Option<(usize, usize)> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| (row, col)))
            .find(|&(row, col)| self.segments_at(row, col).iter().any(&predicate))
    }

    /// Returns a compacted copy with its row order reversed.
    pub fn flipped_vertically(&self) -> Self {
        let mut grid = SegmentGrid {
            rows: self.rows,
            cols: self.cols,
            spans: Vec::with_capacity(self.spans.len()),
            segments: Vec::with_capacity(self.segments.len()),
        };
        for row in (0..self.rows).rev() {
            for col in 0..self.cols {
                let cell = self.segments_at(row, col).to_vec();
                grid.push_cell(&cell);
            }
        }
        grid
    }

    /// Replaces NaN segment bounds with `default` in place.
    ///
    /// # Returns
    /// The number of segments that had at least one NaN bound.
    pub fn replace_missing(&mut self, default: f64) -> usize {
        let mut count = 0;
        for segment in self.segments.iter_mut() {
            let (fixed, replaced) = segment.with_missing_replaced(default);
            if replaced {
                *segment = fixed;
                count += 1;
            }
        }
        count
    }
}

/// Shape-aligned layers ready for voxel composition.
///
/// Land-cover codes are already offset so that 0 is never a valid class, and elevation is
/// relative to the lowest terrain cell.
#[derive(Debug, Clone)]
pub struct AlignedLayers {
    pub building_height: Grid2<f64>,
    pub building_segments: SegmentGrid,
    pub land_cover: Grid2<i32>,
    pub elevation: Grid2<f64>,
    pub canopy_height: Grid2<f64>,
}

impl AlignedLayers {
    /// The common `(rows, cols)` shape, taken from the building height layer.
    pub fn shape(&self) -> (usize, usize) {
        self.building_height.shape()
    }

    /// Checks that every layer shares the building height layer's shape.
    pub fn check_shapes(&self) -> Result<()> {
        let expected = self.shape();
        check_shape("building_segments", expected, self.building_segments.shape())?;
        check_shape("land_cover", expected, self.land_cover.shape())?;
        check_shape("elevation", expected, self.elevation.shape())?;
        check_shape("canopy_height", expected, self.canopy_height.shape())
    }

    /// Checks the values the compositor turns into voxel indices.
    ///
    /// Elevation must be finite, heights may be NaN (missing) but never infinite, and land-cover
    /// codes must already be offset past the void code.
    pub fn check_values(&self) -> Result<()> {
        if let Some((row, col)) = self.elevation.position(|h| !h.is_finite()) {
            return Err(VoxelCityError::NonFiniteElevation { row, col });
        }
        check_heights(&self.building_height, &self.building_segments, &self.canopy_height)?;
        if let Some((row, col)) = self.land_cover.position(|code| *code <= 0) {
            let code = *self.land_cover.get(row, col);
            return Err(VoxelCityError::InvalidLandCover { row, col, code });
        }
        Ok(())
    }
}

fn check_heights(
    building_height: &Grid2<f64>,
    building_segments: &SegmentGrid,
    canopy_height: &Grid2<f64>,
) -> Result<()> {
    let infinite = |layer, (row, col)| VoxelCityError::InfiniteHeight { layer, row, col };
    if let Some(cell) = building_height.position(|h| h.is_infinite()) {
        return Err(infinite("building_height", cell));
    }
    if let Some(cell) = building_segments
        .position(|s| s.min_height.is_infinite() || s.max_height.is_infinite())
    {
        return Err(infinite("building_segments", cell));
    }
    if let Some(cell) = canopy_height.position(|h| h.is_infinite()) {
        return Err(infinite("canopy_height", cell));
    }
    Ok(())
}

fn check_shape(
    layer: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<()> {
    if expected != found {
        return Err(VoxelCityError::shape_mismatch(layer, expected, found));
    }
    Ok(())
}

/// Raw layers as delivered by the data-source collaborators.
#[derive(Debug, Clone)]
pub struct RasterLayers {
    pub building_height: Grid2<f64>,
    pub building_segments: SegmentGrid,
    /// 0-based land-cover classes
    pub land_cover: Grid2<i32>,
    pub elevation: Grid2<f64>,
    pub canopy_height: Grid2<f64>,
    pub building_id: Option<Grid2<u32>>,
}

impl RasterLayers {
    /// Aligns the raw layers into compositor input.
    ///
    /// Steps, in order:
    /// 1. Reject mismatched shapes, non-finite elevation, infinite heights and land-cover
    ///    classes outside `0..i32::MAX`
    /// 2. Flip every layer vertically
    /// 3. Replace NaN building heights and segment bounds with `missing_height`
    /// 4. Offset land-cover classes by one
    /// 5. Re-base elevation so the minimum is 0, flattening building footprints when ids are given
    ///
    /// # Arguments
    /// * `missing_height` - Height in meters substituted for NaN building values
    pub fn normalize(self, missing_height: f64) -> Result<AlignedLayers> {
        let expected = self.building_height.shape();
        check_shape("building_segments", expected, self.building_segments.shape())?;
        check_shape("land_cover", expected, self.land_cover.shape())?;
        check_shape("elevation", expected, self.elevation.shape())?;
        check_shape("canopy_height", expected, self.canopy_height.shape())?;
        if let Some(ids) = &self.building_id {
            check_shape("building_id", expected, ids.shape())?;
        }

        if let Some((row, col)) = self.elevation.position(|h| !h.is_finite()) {
            return Err(VoxelCityError::NonFiniteElevation { row, col });
        }
        check_heights(
            &self.building_height,
            &self.building_segments,
            &self.canopy_height,
        )?;
        if let Some((row, col)) = self
            .land_cover
            .position(|code| *code < 0 || *code == i32::MAX)
        {
            let code = *self.land_cover.get(row, col);
            return Err(VoxelCityError::InvalidLandCover { row, col, code });
        }

        let mut building_height = self.building_height.flipped_vertically();
        let mut missing_heights = 0;
        for height in building_height.values_mut() {
            if height.is_nan() {
                *height = missing_height;
                missing_heights += 1;
            }
        }

        let mut building_segments = self.building_segments.flipped_vertically();
        let missing_segments = building_segments.replace_missing(missing_height);

        if missing_heights > 0 || missing_segments > 0 {
            warn!(
                "Substituted {}m for {} missing building heights and {} segments",
                missing_height, missing_heights, missing_segments
            );
        }

        let mut land_cover = self.land_cover.flipped_vertically();
        for code in land_cover.values_mut() {
            *code += 1;
        }

        let mut elevation = self.elevation.flipped_vertically();
        rebase_to_zero(&mut elevation);
        if let Some(ids) = &self.building_id {
            let ids = ids.flipped_vertically();
            let flattened = flatten_footprints(&ids, &mut elevation);
            debug!("Flattened terrain under {} building footprints", flattened);
            rebase_to_zero(&mut elevation);
        }

        Ok(AlignedLayers {
            building_height,
            building_segments,
            land_cover,
            elevation,
            canopy_height: self.canopy_height.flipped_vertically(),
        })
    }
}

/// Shifts all values so the minimum becomes zero.
fn rebase_to_zero(grid: &mut Grid2<f64>) {
    let min = grid.values().iter().copied().fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        for value in grid.values_mut() {
            *value -= min;
        }
    }
}

/// Sets every cell of each non-zero building id to the mean elevation of that footprint.
///
/// # Returns
/// The number of distinct footprints flattened.
fn flatten_footprints(ids: &Grid2<u32>, elevation: &mut Grid2<f64>) -> usize {
    let mut sums: HashMap<u32, (f64, usize)> = HashMap::new();
    for (id, height) in ids.values().iter().zip(elevation.values()) {
        if *id != 0 {
            let entry = sums.entry(*id).or_insert((0.0, 0));
            entry.0 += height;
            entry.1 += 1;
        }
    }
    for (id, height) in ids.values().iter().zip(elevation.values_mut()) {
        if let Some((sum, count)) = sums.get(id) {
            *height = sum / *count as f64;
        }
    }
    sums.len()
}
