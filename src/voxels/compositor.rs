//! # Voxel Compositor
//!
//! Turns aligned 2D layers into a [`SemanticVoxelGrid`] by synthesizing one vertical stack per
//! grid column.
//!
//! ## Column Stack
//!
//! For a column with ground index `g = round(elevation / voxel_size) + 1`:
//!
//! 1. `[0, g)` is underground (`-1`)
//! 2. `g - 1` carries the land-cover code
//! 3. the tree crown (`-2`) spans `[g + crown_base, g + crown_top)`
//! 4. each building segment (`-3`) spans `[g + round(min / s), g + round(max / s))`
//!
//! Later passes overwrite earlier ones, so buildings win over trees and land cover. Gaps between
//! building segments stay untouched.
//!
//! Columns are independent and are filled in parallel when requested; the result does not
//! depend on the execution mode.
//!
//! ## Individual Grids
//!
//! [`composite_individuals`] keeps each component in its own grid, every column grounded at
//! level 0 instead of at the terrain, and stacks the four into one layered grid with a fixed
//! interval between components.

use log::info;
use rayon::prelude::*;
use serde::Serialize;
use web_time::Instant;

use crate::config::ConversionConfig;
use crate::error::{Result, VoxelCityError};

use super::{
    grid::SemanticVoxelGrid,
    layers::{AlignedLayers, BuildingSegment},
    voxel_code::{VoxelCode, BUILDING, TREE_CROWN, UNDERGROUND},
};

/// Rounds half up, the rounding used for every meters-to-voxels conversion.
#[inline]
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// The inputs needed to fill one column.
#[derive(Debug, Clone, Copy)]
struct ColumnInput<'a> {
    land_cover: VoxelCode,
    elevation: f64,
    canopy_height: f64,
    segments: &'a [BuildingSegment],
}

/// Per-call parameters shared by every column.
#[derive(Debug, Clone, Copy)]
struct ColumnParams {
    voxel_size: f64,
    trunk_height_ratio: f64,
    missing_height: f64,
}

/// Fills `[start, end)` of `column` with `code`, clamped to the column.
fn fill_range(column: &mut [VoxelCode], start: i64, end: i64, code: VoxelCode) {
    let len = column.len() as i64;
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len) as usize;
    if start < end {
        column[start..end].fill(code);
    }
}

/// Returns `(crown_base, crown_top)` in voxels relative to the ground index.
///
/// A crown that would round to zero voxels is widened downward by one voxel as long as its
/// base is above the ground.
pub fn crown_extent(canopy_height: f64, trunk_height_ratio: f64, voxel_size: f64) -> (i64, i64) {
    let mut crown_base = round_half_up(canopy_height * trunk_height_ratio / voxel_size);
    let crown_top = round_half_up(canopy_height / voxel_size);
    if crown_top == crown_base && crown_base > 0 {
        crown_base -= 1;
    }
    (crown_base, crown_top)
}

/// Index of the ground surface cell plus one.
pub fn ground_level(elevation: f64, voxel_size: f64) -> i64 {
    round_half_up(elevation / voxel_size).saturating_add(1)
}

fn fill_column(column: &mut [VoxelCode], input: ColumnInput, params: ColumnParams) {
    let ground = ground_level(input.elevation, params.voxel_size);

    fill_range(column, 0, ground, UNDERGROUND);
    fill_range(column, ground.saturating_sub(1), ground, input.land_cover);

    if input.canopy_height > 0.0 {
        let (crown_base, crown_top) = crown_extent(
            input.canopy_height,
            params.trunk_height_ratio,
            params.voxel_size,
        );
        fill_range(
            column,
            ground.saturating_add(crown_base),
            ground.saturating_add(crown_top),
            TREE_CROWN,
        );
    }

    for segment in input.segments {
        let (segment, _) = segment.with_missing_replaced(params.missing_height);
        let bottom = round_half_up(segment.min_height / params.voxel_size);
        let top = round_half_up(segment.max_height / params.voxel_size);
        fill_range(
            column,
            ground.saturating_add(bottom),
            ground.saturating_add(top),
            BUILDING,
        );
    }
}

/// Runs `fill` on every column of `grid`, with the column's row-major index.
fn for_each_column<F>(grid: &mut SemanticVoxelGrid, parallel: bool, fill: F)
where
    F: Fn(usize, &mut [VoxelCode]) + Sync + Send,
{
    let height = grid.height();
    if height == 0 || grid.rows() * grid.cols() == 0 {
        return;
    }
    if parallel {
        grid.values_mut()
            .par_chunks_mut(height)
            .enumerate()
            .for_each(|(index, column)| fill(index, column));
    } else {
        grid.values_mut()
            .chunks_mut(height)
            .enumerate()
            .for_each(|(index, column)| fill(index, column));
    }
}

/// Computes the shared array height for all columns.
///
/// `ceil(max(building + elevation + canopy) / voxel_size) + 1`, with NaN building heights taking
/// the missing-height default and NaN canopy counting as no tree.
pub fn grid_height(layers: &AlignedLayers, voxel_size: f64, missing_height: f64) -> usize {
    let max_top = layers
        .building_height
        .values()
        .iter()
        .zip(layers.elevation.values())
        .zip(layers.canopy_height.values())
        .map(|((building, elevation), canopy)| {
            let building = if building.is_nan() {
                missing_height
            } else {
                *building
            };
            let canopy = if canopy.is_nan() { 0.0 } else { *canopy };
            building + elevation + canopy
        })
        .fold(0.0_f64, f64::max);
    ((max_top / voxel_size).ceil().max(0.0) as usize).saturating_add(1)
}

/// Builds the semantic voxel grid for the given layers.
///
/// # Arguments
/// * `layers` - Shape-aligned input layers
/// * `config` - Voxel size, trunk ratio, missing-height default and execution mode
///
/// # Returns
/// The composited grid, or a shape, parameter or value error before anything is written.
pub fn composite(layers: &AlignedLayers, config: &ConversionConfig) -> Result<SemanticVoxelGrid> {
    config.validate()?;
    layers.check_shapes()?;
    layers.check_values()?;

    let start_time = Instant::now();
    let (rows, cols) = layers.shape();
    let height = grid_height(layers, config.voxel_size, config.missing_height_default);
    let mut grid = SemanticVoxelGrid::new(rows, cols, height, config.voxel_size);

    let params = ColumnParams {
        voxel_size: config.voxel_size,
        trunk_height_ratio: config.trunk_height_ratio,
        missing_height: config.missing_height_default,
    };
    let input_at = |index: usize| {
        let (row, col) = (index / cols, index % cols);
        ColumnInput {
            land_cover: *layers.land_cover.get(row, col),
            elevation: *layers.elevation.get(row, col),
            canopy_height: *layers.canopy_height.get(row, col),
            segments: layers.building_segments.segments_at(row, col),
        }
    };

    for_each_column(&mut grid, config.parallel, |index, column| {
        fill_column(column, input_at(index), params)
    });

    info!(
        "Composited {}x{}x{} voxel grid in {:?}",
        rows,
        cols,
        height,
        start_time.elapsed()
    );

    Ok(grid)
}

/// Per-component voxel grids and their stacked preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualGrids {
    /// Land-cover code at level 0 of every column
    pub land_cover: SemanticVoxelGrid,
    /// `-3` from level 0 up to the rounded building height
    pub building: SemanticVoxelGrid,
    /// `-2` from level 0 up to the rounded canopy height
    pub tree: SemanticVoxelGrid,
    /// `-1` from level 0 up to and including the rounded terrain height
    pub terrain: SemanticVoxelGrid,
    /// Terrain, land cover, building and tree stacked at `0, L, 2L, 3L`
    pub layered: SemanticVoxelGrid,
    /// The `L` used for `layered`
    pub layered_interval: usize,
}

impl IndividualGrids {
    /// The grids paired with their file stems.
    pub fn named(&self) -> [(&'static str, &SemanticVoxelGrid); 5] {
        [
            ("land_cover", &self.land_cover),
            ("building", &self.building),
            ("tree", &self.tree),
            ("terrain", &self.terrain),
            ("layered", &self.layered),
        ]
    }
}

/// Builds one grid per component plus the layered grid.
///
/// Component grids are `ceil(max(building + elevation + canopy) / voxel_size)` levels tall,
/// at least one. Building columns use the column's building height, not its segments.
///
/// # Arguments
/// * `layers` - Shape-aligned input layers
/// * `config` - Voxel size, missing-height default and execution mode
/// * `layered_interval` - Levels between stacked components; `None` or 0 picks
///   `max(height, round(rows / 4))`
pub fn composite_individuals(
    layers: &AlignedLayers,
    config: &ConversionConfig,
    layered_interval: Option<usize>,
) -> Result<IndividualGrids> {
    config.validate()?;
    layers.check_shapes()?;
    layers.check_values()?;

    let start_time = Instant::now();
    let (rows, cols) = layers.shape();
    let voxel_size = config.voxel_size;
    let height = grid_height(layers, voxel_size, config.missing_height_default)
        .saturating_sub(1)
        .max(1);
    let levels = |meters: f64| round_half_up(meters / voxel_size);
    let cell = |index: usize| (index / cols, index % cols);

    let mut land_cover = SemanticVoxelGrid::new(rows, cols, height, voxel_size);
    for_each_column(&mut land_cover, config.parallel, |index, column| {
        let (row, col) = cell(index);
        column[0] = *layers.land_cover.get(row, col);
    });

    let mut building = SemanticVoxelGrid::new(rows, cols, height, voxel_size);
    for_each_column(&mut building, config.parallel, |index, column| {
        let (row, col) = cell(index);
        let mut top = *layers.building_height.get(row, col);
        if top.is_nan() {
            top = config.missing_height_default;
        }
        fill_range(column, 0, levels(top), BUILDING);
    });

    let mut tree = SemanticVoxelGrid::new(rows, cols, height, voxel_size);
    for_each_column(&mut tree, config.parallel, |index, column| {
        let (row, col) = cell(index);
        fill_range(column, 0, levels(*layers.canopy_height.get(row, col)), TREE_CROWN);
    });

    let mut terrain = SemanticVoxelGrid::new(rows, cols, height, voxel_size);
    for_each_column(&mut terrain, config.parallel, |index, column| {
        let (row, col) = cell(index);
        let ground = levels(*layers.elevation.get(row, col));
        fill_range(column, 0, ground.saturating_add(1), UNDERGROUND);
    });

    let interval = match layered_interval {
        Some(interval) if interval > 0 => interval,
        _ => height.max(round_half_up(rows as f64 / 4.0) as usize),
    };
    let layered_height = interval.checked_mul(4).ok_or_else(|| {
        VoxelCityError::invalid_parameter(
            "layered_interval",
            interval as f64,
            "four intervals must fit in memory",
        )
    })?;
    let extract = interval.min(height);
    let mut layered = SemanticVoxelGrid::new(rows, cols, layered_height, voxel_size);
    let stack = [&terrain, &land_cover, &building, &tree];
    for_each_column(&mut layered, config.parallel, |index, column| {
        let (row, col) = cell(index);
        for (slot, component) in stack.iter().enumerate() {
            let start = slot * interval;
            column[start..start + extract].copy_from_slice(&component.column(row, col)[..extract]);
        }
    });

    info!(
        "Composited individual {}x{}x{} grids and {} level layered grid in {:?}",
        rows,
        cols,
        height,
        layered_height,
        start_time.elapsed()
    );

    Ok(IndividualGrids {
        land_cover,
        building,
        tree,
        terrain,
        layered,
        layered_interval: interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::layers::{Grid2, SegmentGrid};

    fn single_column(
        land_cover: i32,
        elevation: f64,
        canopy: f64,
        building_height: f64,
        segments: Vec<BuildingSegment>,
    ) -> AlignedLayers {
        AlignedLayers {
            building_height: Grid2::filled(1, 1, building_height),
            building_segments: SegmentGrid::from_rows(vec![vec![segments]]).unwrap(),
            land_cover: Grid2::filled(1, 1, land_cover),
            elevation: Grid2::filled(1, 1, elevation),
            canopy_height: Grid2::filled(1, 1, canopy),
        }
    }

    fn config(voxel_size: f64, trunk_height_ratio: f64) -> ConversionConfig {
        ConversionConfig {
            voxel_size,
            trunk_height_ratio,
            ..ConversionConfig::default()
        }
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(0.0), 0);
    }

    #[test]
    fn ground_stack_has_underground_and_surface() {
        let layers = single_column(4, 3.0, 0.0, 0.0, vec![]);
        let grid = composite(&layers, &config(1.0, 0.6)).unwrap();

        // ground level 4, height ceil(3) + 1
        assert_eq!(grid.column(0, 0), &[-1, -1, -1, 4]);
    }

    #[test]
    fn tree_crown_occupies_rounded_interval() {
        let layers = single_column(1, 0.0, 9.0, 0.0, vec![]);
        let grid = composite(&layers, &config(1.0, 0.6)).unwrap();
        let column = grid.column(0, 0);

        // ground level 1: surface at 0, crown at 1 + [5, 9)
        assert_eq!(column[0], 1);
        for (offset, code) in column[1..].iter().enumerate() {
            let expected = if (5..9).contains(&offset) { -2 } else { 0 };
            assert_eq!(*code, expected, "offset {offset}");
        }
    }

    #[test]
    fn tiny_crown_keeps_one_voxel() {
        assert_eq!(crown_extent(1.0, 0.6, 1.0), (0, 1));
        assert_eq!(crown_extent(2.2, 0.9, 1.0), (1, 2));
        assert_eq!(crown_extent(0.2, 0.5, 1.0), (0, 0));
    }

    #[test]
    fn building_gap_is_not_filled() {
        let segments = vec![BuildingSegment::new(0.0, 3.0), BuildingSegment::new(5.0, 8.0)];
        let layers = single_column(2, 0.0, 0.0, 8.0, segments);
        let grid = composite(&layers, &config(1.0, 0.6)).unwrap();
        let column = &grid.column(0, 0)[1..];

        assert_eq!(&column[0..3], &[-3, -3, -3]);
        assert_eq!(&column[3..5], &[0, 0]);
        assert_eq!(&column[5..8], &[-3, -3, -3]);
    }

    #[test]
    fn building_overwrites_tree_and_surface() {
        let segments = vec![BuildingSegment::new(-1.0, 4.0)];
        let layers = single_column(6, 0.0, 5.0, 4.0, segments);
        let grid = composite(&layers, &config(1.0, 0.2)).unwrap();
        let column = grid.column(0, 0);

        // surface cell at 0 is overwritten by the segment starting one voxel below ground
        assert_eq!(&column[0..5], &[-3, -3, -3, -3, -3]);
        assert_eq!(column[5], -2);
    }

    #[test]
    fn nan_segment_matches_explicit_default() {
        let with_nan = single_column(1, 0.0, 0.0, 10.0, vec![BuildingSegment::new(0.0, f64::NAN)]);
        let explicit = single_column(1, 0.0, 0.0, 10.0, vec![BuildingSegment::new(0.0, 10.0)]);
        let config = config(1.0, 0.6);

        assert_eq!(
            composite(&with_nan, &config).unwrap(),
            composite(&explicit, &config).unwrap()
        );
    }

    #[test]
    fn grid_height_uses_tallest_column() {
        let layers = AlignedLayers {
            building_height: Grid2::from_rows("b", vec![vec![10.0, 0.0]]).unwrap(),
            building_segments: SegmentGrid::empty(1, 2),
            land_cover: Grid2::filled(1, 2, 1),
            elevation: Grid2::from_rows("e", vec![vec![1.0, 2.0]]).unwrap(),
            canopy_height: Grid2::from_rows("c", vec![vec![0.0, 12.5]]).unwrap(),
        };
        // max(11, 14.5) / 2 -> ceil 8, + 1
        assert_eq!(grid_height(&layers, 2.0, 10.0), 9);
    }

    #[test]
    fn mismatched_shapes_fail_before_writing() {
        let mut layers = single_column(1, 0.0, 0.0, 0.0, vec![]);
        layers.elevation = Grid2::filled(2, 1, 0.0);
        assert!(matches!(
            composite(&layers, &config(1.0, 0.6)),
            Err(crate::error::VoxelCityError::ShapeMismatch { layer: "elevation", .. })
        ));
    }

    #[test]
    fn infinite_inputs_fail_instead_of_overflowing() {
        let config = config(1.0, 0.6);
        let tall_segment =
            single_column(1, 0.0, 0.0, 5.0, vec![BuildingSegment::new(0.0, f64::INFINITY)]);
        let tall_tree = single_column(1, 0.0, f64::INFINITY, 0.0, vec![]);

        assert!(matches!(
            composite(&tall_segment, &config),
            Err(crate::error::VoxelCityError::InfiniteHeight { layer: "building_segments", .. })
        ));
        assert!(matches!(
            composite(&tall_tree, &config),
            Err(crate::error::VoxelCityError::InfiniteHeight { layer: "canopy_height", .. })
        ));
    }

    #[test]
    fn huge_finite_segment_is_clamped_to_the_column() {
        let mut column = vec![0; 4];
        let input = ColumnInput {
            land_cover: 2,
            elevation: 0.0,
            canopy_height: 1e300,
            segments: &[BuildingSegment::new(1.0, 1e300)],
        };
        let params = ColumnParams {
            voxel_size: 1.0,
            trunk_height_ratio: 0.5,
            missing_height: 10.0,
        };

        fill_column(&mut column, input, params);

        assert_eq!(column, vec![2, 0, -3, -3]);
    }

    fn two_column_layers() -> AlignedLayers {
        AlignedLayers {
            building_height: Grid2::from_rows("b", vec![vec![3.0, 0.0]]).unwrap(),
            building_segments: SegmentGrid::empty(1, 2),
            land_cover: Grid2::from_rows("l", vec![vec![3, 5]]).unwrap(),
            elevation: Grid2::from_rows("e", vec![vec![0.0, 2.0]]).unwrap(),
            canopy_height: Grid2::from_rows("c", vec![vec![0.0, 1.4]]).unwrap(),
        }
    }

    #[test]
    fn individual_grids_are_grounded_at_level_zero() {
        let grids = composite_individuals(&two_column_layers(), &config(1.0, 0.6), None).unwrap();

        // ceil(max(3, 2 + 1.4)) levels, no extra level above
        assert_eq!(grids.land_cover.dimensions(), (1, 2, 4));
        assert_eq!(grids.land_cover.column(0, 0), &[3, 0, 0, 0]);
        assert_eq!(grids.land_cover.column(0, 1), &[5, 0, 0, 0]);
        assert_eq!(grids.building.column(0, 0), &[-3, -3, -3, 0]);
        assert_eq!(grids.building.column(0, 1), &[0, 0, 0, 0]);
        assert_eq!(grids.tree.column(0, 0), &[0, 0, 0, 0]);
        assert_eq!(grids.tree.column(0, 1), &[-2, 0, 0, 0]);
        assert_eq!(grids.terrain.column(0, 0), &[-1, 0, 0, 0]);
        assert_eq!(grids.terrain.column(0, 1), &[-1, -1, -1, 0]);
    }

    #[test]
    fn layered_grid_stacks_components_at_fixed_interval() {
        let layers = two_column_layers();

        let grids = composite_individuals(&layers, &config(1.0, 0.6), None).unwrap();
        // Defaults to the component height when that exceeds rows / 4.
        assert_eq!(grids.layered_interval, 4);
        assert_eq!(grids.layered.height(), 16);
        assert_eq!(
            grids.layered.column(0, 1),
            &[-1, -1, -1, 0, 5, 0, 0, 0, 0, 0, 0, 0, -2, 0, 0, 0]
        );

        let grids = composite_individuals(&layers, &config(1.0, 0.6), Some(2)).unwrap();
        assert_eq!(grids.layered.height(), 8);
        assert_eq!(grids.layered.column(0, 0), &[-1, 0, 3, 0, -3, -3, 0, 0]);

        let grids = composite_individuals(&layers, &config(1.0, 0.6), Some(6)).unwrap();
        assert_eq!(grids.layered.height(), 24);
        assert_eq!(&grids.layered.column(0, 0)[6..12], &[3, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn flat_empty_scene_keeps_one_level() {
        let layers = single_column(2, 0.0, 0.0, 0.0, vec![]);
        let grids = composite_individuals(&layers, &config(1.0, 0.6), None).unwrap();
        assert_eq!(grids.land_cover.column(0, 0), &[2]);
        assert_eq!(grids.terrain.column(0, 0), &[-1]);
        assert_eq!(grids.layered.column(0, 0), &[-1, 2, 0, 0]);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut rng = fastrand::Rng::with_seed(7);
        let rows = 6;
        let cols = 5;
        let mut segments = Vec::new();
        for _ in 0..rows {
            let mut row = Vec::new();
            for _ in 0..cols {
                let bottom = rng.f64() * 4.0;
                row.push(vec![BuildingSegment::new(bottom, bottom + rng.f64() * 6.0)]);
            }
            segments.push(row);
        }
        let random_grid = |rng: &mut fastrand::Rng, scale: f64| {
            let values = (0..rows)
                .map(|_| (0..cols).map(|_| rng.f64() * scale).collect())
                .collect();
            Grid2::from_rows("random", values).unwrap()
        };
        let layers = AlignedLayers {
            building_height: Grid2::filled(rows, cols, 10.0),
            building_segments: SegmentGrid::from_rows(segments).unwrap(),
            land_cover: Grid2::filled(rows, cols, 3),
            elevation: random_grid(&mut rng, 5.0),
            canopy_height: random_grid(&mut rng, 8.0),
        };

        let mut sequential = config(1.0, 0.6);
        sequential.parallel = false;
        let mut parallel = sequential.clone();
        parallel.parallel = true;

        assert_eq!(
            composite(&layers, &sequential).unwrap(),
            composite(&layers, &parallel).unwrap()
        );
    }
}
