//! # Numeric Surface Export
//!
//! Drapes a 2D grid of numeric values (simulation or analysis results) over the terrain as one
//! flat, coloured quad per cell.
//!
//! Each finite value is normalized with `vmin`/`vmax`, clipped to `[0, 1]` and mapped to one of
//! `num_colors` discrete colormap colours. Cells sharing a colour share a material named
//! `material_R_G_B`. Quad heights snap to the cell size one cell above the terrain, so the
//! surface sits on the voxel ground layer.

use cgmath::Point3;
use log::{info, warn};
use web_time::Instant;

use crate::error::{Result, VoxelCityError};
use crate::materials::{colormap::Colormap, Material, Rgb};
use crate::meshing::MeshBundle;
use crate::meshing::MeshAssembler;
use crate::voxels::layers::Grid2;

/// Parameters of a numeric surface export.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    /// Edge length of one cell in meters
    pub cell_size: f64,
    /// Height added to every quad after snapping
    pub offset: f64,
    pub colormap: String,
    pub num_colors: usize,
    /// Opacity written to every material
    pub alpha: f64,
    /// Lower end of the colour range; defaults to the smallest finite value
    pub vmin: Option<f64>,
    /// Upper end of the colour range; defaults to the largest finite value
    pub vmax: Option<f64>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        SurfaceOptions {
            cell_size: 1.0,
            offset: 0.0,
            colormap: "viridis".to_string(),
            num_colors: 256,
            alpha: 1.0,
            vmin: None,
            vmax: None,
        }
    }
}

impl SurfaceOptions {
    fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(VoxelCityError::invalid_parameter(
                "cell_size",
                self.cell_size,
                "must be finite and positive",
            ));
        }
        if !self.offset.is_finite() {
            return Err(VoxelCityError::invalid_parameter(
                "offset",
                self.offset,
                "must be finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(VoxelCityError::invalid_parameter(
                "alpha",
                self.alpha,
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// The export name of a surface colour.
pub fn surface_material_name(color: Rgb) -> String {
    format!("material_{}_{}_{}", color.r, color.g, color.b)
}

/// Builds the surface mesh of `values` draped over `dem`.
///
/// # Arguments
/// * `values` - The numeric grid; NaN and infinite cells are skipped
/// * `dem` - Terrain elevation in meters, same shape as `values`
/// * `options` - Colouring and placement parameters
///
/// # Returns
/// A bundle without normals whose triangles reference vertices only, or
/// * `ShapeMismatch` if the grids differ in shape
/// * `InvalidMaterialTable` if the colormap is unknown
/// * `DegenerateRange` if the effective `vmin` equals `vmax`
pub fn build_surface(
    values: &Grid2<f64>,
    dem: &Grid2<f64>,
    options: &SurfaceOptions,
) -> Result<MeshBundle> {
    if values.shape() != dem.shape() {
        return Err(VoxelCityError::shape_mismatch(
            "elevation",
            values.shape(),
            dem.shape(),
        ));
    }
    options.validate()?;
    let colors = Colormap::by_name(&options.colormap)?.discretize(options.num_colors)?;

    let start_time = Instant::now();
    let values = values.flipped_vertically();
    let mut dem = dem.flipped_vertically();
    let dem_min = dem
        .values()
        .iter()
        .copied()
        .filter(|h| h.is_finite())
        .fold(f64::INFINITY, f64::min);
    if dem_min.is_finite() {
        for height in dem.values_mut() {
            *height -= dem_min;
        }
    }

    let finite = values.values().iter().copied().filter(|v| v.is_finite());
    let data_min = finite.clone().fold(f64::INFINITY, f64::min);
    let data_max = finite.fold(f64::NEG_INFINITY, f64::max);
    if !data_min.is_finite() {
        warn!("Value grid has no finite cells, the surface is empty");
        return Ok(MeshBundle {
            vertices: Vec::new(),
            normals: Vec::new(),
            groups: Vec::new(),
        });
    }

    let vmin = options.vmin.unwrap_or(data_min);
    let vmax = options.vmax.unwrap_or(data_max);
    if vmin == vmax {
        return Err(VoxelCityError::DegenerateRange {
            min: vmin,
            max: vmax,
        });
    }

    let cell = options.cell_size;
    let mut assembler = MeshAssembler::new();
    let mut skipped = 0usize;
    for row in 0..values.rows() {
        for col in 0..values.cols() {
            let value = *values.get(row, col);
            let height = *dem.get(row, col);
            if !value.is_finite() || !height.is_finite() {
                skipped += 1;
                continue;
            }

            let normalized = ((value - vmin) / (vmax - vmin)).clamp(0.0, 1.0);
            let color = colors.color(normalized);

            let z = cell * (height / cell + 1.5).floor() + options.offset;
            let (x0, x1) = (row as f64 * cell, (row + 1) as f64 * cell);
            let (y0, y1) = (col as f64 * cell, (col + 1) as f64 * cell);
            let corners = [
                Point3::new(x0, y0, z),
                Point3::new(x1, y0, z),
                Point3::new(x1, y1, z),
                Point3::new(x0, y1, z),
            ];
            assembler.add_quad(color, corners, [[0, 1, 2], [0, 2, 3]], 0);
        }
    }

    let quads = assembler.quad_count();
    let bundle = assembler.finish(Vec::new(), |color| Material {
        name: surface_material_name(*color),
        label: surface_material_name(*color),
        color: *color,
        alpha: options.alpha,
    });

    info!(
        "Surface export: {} quads, {} skipped cells, {} colours in {:?}",
        quads,
        skipped,
        bundle.groups.len(),
        start_time.elapsed()
    );
    Ok(bundle)
}
